//! End-to-end entity resolution over a batch with several simultaneous
//! clusters, cross-source aggregation, and an unrelated singleton —
//! closer to a real extraction-stage batch than the resolver's own
//! single-cluster unit tests.
use sentineldesk_common::config::{CanonicalStrategy, ResolverConfig};
use sentineldesk_engine::resolver::EntityResolver;

fn tagged(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(n, s)| (n.to_string(), s.to_string())).collect()
}

#[test]
fn a_mixed_batch_resolves_every_legal_suffix_variant_into_its_own_cluster() {
    let resolver = EntityResolver::new(ResolverConfig::default());

    let inputs = tagged(&[
        ("Acme Security Inc.", "patent"),
        ("Acme Security Inc", "article"),
        ("Acme Security, LLC", "patent"),
        ("Fortinet Inc.", "patent"),
        ("Fortinet Incorporated", "patent"),
        ("Fortinet, LLC", "patent"),
        ("Totally Different Widgets Corp", "patent"),
    ]);

    let output = resolver.resolve(&inputs);

    assert_eq!(output.entities.len(), 3);
    assert_eq!(output.alias_links.len(), 7);

    let acme = output
        .entities
        .iter()
        .find(|e| e.aliases.iter().any(|a| a.starts_with("Acme")))
        .expect("acme cluster should exist");
    assert_eq!(acme.aliases.len(), 3);
    assert_eq!(acme.sources.len(), 2, "acme cluster spans both patent and article sources");

    let fortinet = output
        .entities
        .iter()
        .find(|e| e.aliases.iter().any(|a| a.starts_with("Fortinet")))
        .expect("fortinet cluster should exist");
    assert_eq!(fortinet.aliases.len(), 3);
    assert_eq!(fortinet.sources.len(), 1);

    let unrelated = output
        .entities
        .iter()
        .find(|e| e.canonical_name.contains("Widgets"))
        .expect("unrelated company should remain its own entity");
    assert_eq!(unrelated.aliases.len(), 1);
}

#[test]
fn canonical_strategy_changes_which_alias_represents_the_cluster() {
    let inputs = tagged(&[
        ("Acme Security Inc.", "patent"),
        ("Acme Security Incorporated", "article"),
    ]);

    // Both variants normalize to the identical "acme security" token
    // string, so Longest ties on normalized length and falls back to
    // lexicographically-smallest — "Inc." sorts before "Incorporated".
    let longest = EntityResolver::new(ResolverConfig {
        canonical_strategy: CanonicalStrategy::Longest,
        ..ResolverConfig::default()
    })
    .resolve(&inputs);
    assert_eq!(longest.entities.len(), 1);
    assert_eq!(longest.entities[0].canonical_name, "Acme Security Inc.");

    let most_frequent_inputs = tagged(&[
        ("Acme Security Inc.", "patent"),
        ("Acme Security Inc.", "article"),
        ("Acme Security Incorporated", "patent"),
    ]);
    let most_frequent = EntityResolver::new(ResolverConfig {
        canonical_strategy: CanonicalStrategy::MostFrequent,
        ..ResolverConfig::default()
    })
    .resolve(&most_frequent_inputs);
    assert_eq!(most_frequent.entities[0].canonical_name, "Acme Security Inc.");
}

#[test]
fn every_distinct_raw_name_gets_exactly_one_alias_link_regardless_of_clustering() {
    let resolver = EntityResolver::new(ResolverConfig::default());
    let inputs = tagged(&[
        ("Zscaler Inc.", "patent"),
        ("Zscaler Inc.", "article"),
        ("Zscaler, Inc", "patent"),
        ("Fortinet Inc.", "patent"),
    ]);

    let output = resolver.resolve(&inputs);

    let distinct_raw_names: std::collections::HashSet<&str> =
        inputs.iter().map(|(n, _)| n.trim()).collect();
    assert_eq!(output.alias_links.len(), distinct_raw_names.len());
}
