pub mod normalize;
pub mod similarity;
mod union_find;

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sentineldesk_common::config::{CanonicalStrategy, ResolverConfig};
use sentineldesk_common::types::{AliasLink, ResolvedEntity};

use union_find::UnionFind;

/// Entity resolution engine (C6): folds raw company-name strings into
/// canonical entities via normalization, blocking, pairwise similarity
/// and union-find clustering.
pub struct EntityResolver {
    config: ResolverConfig,
}

/// Result of a resolution pass: one `ResolvedEntity` per cluster and
/// exactly one `AliasLink` per distinct raw input name.
pub struct ResolutionOutput {
    pub entities: Vec<ResolvedEntity>,
    pub alias_links: Vec<AliasLink>,
}

impl EntityResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// `inputs` is `(raw_name, source_tag)`; the same raw name may appear
    /// more than once (from different sources) and is deduplicated here,
    /// aggregating its sources onto a single alias link.
    pub fn resolve(&self, inputs: &[(String, String)]) -> ResolutionOutput {
        let (order, sources_by_name) = dedupe_inputs(inputs);

        let mut uf: UnionFind<String> = UnionFind::new();
        for name in &order {
            uf.insert(name);
        }

        let blocks = self.build_blocks(&order);
        let mut pair_decisions: HashMap<(String, String), similarity::MatchDecision> = HashMap::new();
        let mut seen_pairs: HashSet<(String, String)> = HashSet::new();

        for members in blocks.values() {
            if members.len() < self.config.min_block_size || members.len() > self.config.max_block_size {
                continue;
            }
            for i in 0..members.len() {
                for j in (i + 1)..members.len() {
                    let pair = canonical_pair(&members[i], &members[j]);
                    if !seen_pairs.insert(pair.clone()) {
                        continue;
                    }
                    let decision = similarity::is_match(&self.config, &pair.0, &pair.1);
                    if decision.is_match {
                        uf.union(&pair.0, &pair.1);
                    }
                    pair_decisions.insert(pair, decision);
                }
            }
        }

        let raw_clusters = uf.clusters();
        let mut final_clusters: Vec<Vec<String>> = Vec::new();
        for members in raw_clusters.into_values() {
            if members.len() > self.config.max_cluster_size {
                tracing::warn!(
                    size = members.len(),
                    limit = self.config.max_cluster_size,
                    "cluster exceeds max_cluster_size, splitting into singletons"
                );
                for member in members {
                    final_clusters.push(vec![member]);
                }
            } else {
                final_clusters.push(members);
            }
        }

        let mut entities = Vec::with_capacity(final_clusters.len());
        let mut alias_links = Vec::with_capacity(order.len());

        for mut members in final_clusters {
            members.sort_by_key(|m| order.iter().position(|o| o == m).unwrap_or(usize::MAX));

            let canonical = self.pick_canonical(&members, &sources_by_name, &pair_decisions);
            let sources = aggregate_sources(&members, &sources_by_name);
            let confidence = mean_pairwise_score(&members, &canonical, &pair_decisions, &self.config);

            let entity = ResolvedEntity::new(canonical.clone(), members.clone(), sources, confidence, Utc::now());

            for member in &members {
                let (score, rules) = if member == &canonical {
                    (1.0, vec!["canonical".to_string()])
                } else {
                    let pair = canonical_pair(member, &canonical);
                    match pair_decisions.get(&pair) {
                        Some(decision) => (decision.score, decision.rules_applied.clone()),
                        None => {
                            let decision = similarity::is_match(&self.config, member, &canonical);
                            (decision.score, decision.rules_applied)
                        }
                    }
                };
                alias_links.push(AliasLink::new(member.clone(), canonical.clone(), score, rules));
            }

            entities.push(entity);
        }

        ResolutionOutput { entities, alias_links }
    }

    /// Generates the four blocking-key families: first token, 3-char
    /// prefix, sorted-token signature, and length bucket. A name lands in
    /// one block per family, so it can be compared against candidates it
    /// wouldn't share a block with under any single scheme.
    fn build_blocks(&self, names: &[String]) -> HashMap<String, Vec<String>> {
        let mut blocks: HashMap<String, Vec<String>> = HashMap::new();

        for name in names {
            let normalized = normalize::normalize(&self.config, name);
            if normalized.is_empty() {
                continue;
            }

            let tokens: Vec<&str> = normalized.split_whitespace().collect();
            if let Some(first) = tokens.first() {
                blocks.entry(format!("first:{first}")).or_default().push(name.clone());
            }

            let prefix: String = normalized.chars().take(3).collect();
            blocks.entry(format!("prefix:{prefix}")).or_default().push(name.clone());

            let mut sorted_tokens = tokens.clone();
            sorted_tokens.sort_unstable();
            let sig: String = sorted_tokens.concat().chars().take(10).collect();
            blocks.entry(format!("sig:{sig}")).or_default().push(name.clone());

            let len_bucket = normalized.chars().count() / 10;
            blocks.entry(format!("len:{len_bucket}")).or_default().push(name.clone());
        }

        blocks
    }

    fn pick_canonical(
        &self,
        members: &[String],
        sources_by_name: &HashMap<String, Vec<String>>,
        pair_decisions: &HashMap<(String, String), similarity::MatchDecision>,
    ) -> String {
        if members.len() == 1 {
            return members[0].clone();
        }

        match self.config.canonical_strategy {
            CanonicalStrategy::Longest => longest_then_lex(&self.config, members),
            CanonicalStrategy::MostFrequent => {
                let max_freq = members.iter().map(|m| sources_by_name[m].len()).max().unwrap_or(1);
                let candidates: Vec<String> = members
                    .iter()
                    .filter(|m| sources_by_name[*m].len() == max_freq)
                    .cloned()
                    .collect();
                longest_then_lex(&self.config, &candidates)
            }
            CanonicalStrategy::HighestScore => {
                let mut best: Option<(String, f64)> = None;
                for member in members {
                    let mean = mean_pairwise_score(members, member, pair_decisions, &self.config);
                    best = match best {
                        None => Some((member.clone(), mean)),
                        Some((best_name, best_mean)) => {
                            if mean > best_mean || (mean == best_mean && member < &best_name) {
                                Some((member.clone(), mean))
                            } else {
                                Some((best_name, best_mean))
                            }
                        }
                    };
                }
                best.map(|(name, _)| name).unwrap_or_else(|| members[0].clone())
            }
        }
    }
}

fn dedupe_inputs(inputs: &[(String, String)]) -> (Vec<String>, HashMap<String, Vec<String>>) {
    let mut order = Vec::new();
    let mut sources_by_name: HashMap<String, Vec<String>> = HashMap::new();

    for (name, source) in inputs {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let name = name.to_string();
        if !sources_by_name.contains_key(&name) {
            order.push(name.clone());
        }
        let sources = sources_by_name.entry(name).or_default();
        if !sources.contains(source) {
            sources.push(source.clone());
        }
    }

    (order, sources_by_name)
}

fn aggregate_sources(members: &[String], sources_by_name: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut sources = Vec::new();
    let mut seen = HashSet::new();
    for member in members {
        for source in &sources_by_name[member] {
            if seen.insert(source.clone()) {
                sources.push(source.clone());
            }
        }
    }
    sources
}

fn canonical_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Longest normalized form wins; ties break on lexicographically smallest
/// original string so the result doesn't depend on input order.
fn longest_then_lex(config: &ResolverConfig, members: &[String]) -> String {
    let mut best: Option<(&String, usize)> = None;
    for member in members {
        let len = normalize::normalize(config, member).chars().count();
        best = match best {
            None => Some((member, len)),
            Some((best_member, best_len)) => {
                if len > best_len || (len == best_len && member < best_member) {
                    Some((member, len))
                } else {
                    Some((best_member, best_len))
                }
            }
        };
    }
    best.map(|(m, _)| m.clone()).unwrap_or_default()
}

fn mean_pairwise_score(
    members: &[String],
    reference: &str,
    pair_decisions: &HashMap<(String, String), similarity::MatchDecision>,
    config: &ResolverConfig,
) -> f64 {
    if members.len() <= 1 {
        return 1.0;
    }

    let mut total = 0.0;
    let mut count = 0usize;
    for member in members {
        if member == reference {
            continue;
        }
        let pair = canonical_pair(member, reference);
        let score = pair_decisions
            .get(&pair)
            .map(|d| d.score)
            .unwrap_or_else(|| similarity::composite_score(config, member, reference).composite);
        total += score;
        count += 1;
    }

    if count == 0 {
        1.0
    } else {
        (total / count as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResolverConfig {
        ResolverConfig::default()
    }

    fn tagged(names: &[&str], source: &str) -> Vec<(String, String)> {
        names.iter().map(|n| (n.to_string(), source.to_string())).collect()
    }

    #[test]
    fn near_duplicate_names_cluster_into_one_entity() {
        let resolver = EntityResolver::new(config());
        let inputs = tagged(
            &["Acme Security Inc.", "Acme Security Inc", "Acme Security, LLC"],
            "patent",
        );
        let output = resolver.resolve(&inputs);

        assert_eq!(output.entities.len(), 1);
        assert_eq!(output.alias_links.len(), 3);
        assert!(output.entities[0].aliases.len() == 3);
    }

    #[test]
    fn unrelated_names_stay_as_separate_entities() {
        let resolver = EntityResolver::new(config());
        let inputs = tagged(&["Acme Security", "Totally Different Widgets"], "patent");
        let output = resolver.resolve(&inputs);

        assert_eq!(output.entities.len(), 2);
    }

    #[test]
    fn duplicate_raw_names_produce_one_alias_link_with_merged_sources() {
        let resolver = EntityResolver::new(config());
        let mut inputs = tagged(&["Acme Security Inc."], "patent");
        inputs.extend(tagged(&["Acme Security Inc."], "article"));
        let output = resolver.resolve(&inputs);

        assert_eq!(output.alias_links.len(), 1);
        assert_eq!(output.entities.len(), 1);
        assert_eq!(output.entities[0].sources.len(), 2);
    }

    #[test]
    fn degenerate_cluster_is_split_into_singletons() {
        let mut config = config();
        config.max_cluster_size = 3;
        config.hard_match_threshold = 0.0;
        config.soft_match_threshold = 0.0;
        let resolver = EntityResolver::new(config);

        let names: Vec<String> = (0..10).map(|i| format!("Company Variant {i}")).collect();
        let inputs: Vec<(String, String)> = names.iter().map(|n| (n.clone(), "patent".to_string())).collect();
        let output = resolver.resolve(&inputs);

        assert_eq!(output.entities.len(), 10);
        assert!(output.entities.iter().all(|e| e.aliases.len() == 1));
    }

    #[test]
    fn entity_id_is_stable_across_runs_on_the_same_input() {
        let resolver = EntityResolver::new(config());
        let inputs = tagged(&["Acme Security Inc.", "Acme Security Inc"], "patent");

        let first = resolver.resolve(&inputs);
        let second = resolver.resolve(&inputs);

        assert_eq!(first.entities[0].entity_id, second.entities[0].entity_id);
    }

    #[test]
    fn most_frequent_strategy_prefers_the_name_seen_from_more_sources() {
        let mut config = config();
        config.canonical_strategy = CanonicalStrategy::MostFrequent;
        let resolver = EntityResolver::new(config);

        let mut inputs = tagged(&["Acme Security Inc."], "patent");
        inputs.extend(tagged(&["Acme Security Inc."], "article"));
        inputs.extend(tagged(&["Acme Security Inc"], "patent"));

        let output = resolver.resolve(&inputs);
        assert_eq!(output.entities[0].canonical_name, "Acme Security Inc.");
    }
}
