use std::collections::HashSet;

use sentineldesk_common::config::ResolverConfig;

/// Normalizes company names into a canonical token form for matching:
/// case-folds, replaces `&`/`/`, strips punctuation, removes legal
/// suffixes and a single trailing corporate stopword, and dedupes
/// tokens while preserving first-seen order.
pub fn normalize(config: &ResolverConfig, name: &str) -> String {
    if name.trim().is_empty() {
        return String::new();
    }

    let folded = name
        .to_lowercase()
        .replace('&', " and ")
        .replace('/', " ");

    let cleaned: String = folded
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    tokens = remove_legal_suffixes(config, tokens);

    if tokens.len() > 2 {
        if let Some(last) = tokens.last() {
            if config.corporate_stopwords.iter().any(|s| s == last) {
                tokens.pop();
            }
        }
    }

    let mut seen = HashSet::new();
    let unique: Vec<&str> = tokens.into_iter().filter(|t| seen.insert(*t)).collect();

    unique.join(" ")
}

fn remove_legal_suffixes<'a>(config: &ResolverConfig, mut tokens: Vec<&'a str>) -> Vec<&'a str> {
    if tokens.is_empty() {
        return tokens;
    }

    if let Some(last) = tokens.last() {
        if config.legal_suffixes.iter().any(|s| s == last) {
            tokens.pop();
        }
    }

    if tokens.len() >= 2 {
        let last_two = format!("{} {}", tokens[tokens.len() - 2], tokens[tokens.len() - 1]);
        if config.two_token_legal_suffixes.iter().any(|s| *s == last_two) {
            tokens.truncate(tokens.len() - 2);
        }
    }

    tokens
}

/// Token set used by the Jaccard component of the composite score and
/// by blocking-key generation. Order doesn't matter here, only membership.
pub fn extract_tokens(config: &ResolverConfig, name: &str) -> HashSet<String> {
    let normalized = normalize(config, name);
    if normalized.is_empty() {
        HashSet::new()
    } else {
        normalized.split_whitespace().map(String::from).collect()
    }
}

/// A name looks like an acronym if it's a single short all-caps token
/// in its original (pre-normalization) form.
pub fn is_acronym(name: &str) -> bool {
    let trimmed = name.trim();
    let mut parts = trimmed.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(first), None) => first.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) && first.len() <= 5,
        _ => false,
    }
}

/// Expands a known acronym to its full name via the configured mapping,
/// leaving unrecognized acronyms unchanged.
pub fn expand_acronym(config: &ResolverConfig, acronym: &str) -> String {
    let normalized = normalize(config, acronym);
    config
        .acronym_expansions
        .get(&normalized)
        .cloned()
        .unwrap_or(normalized)
}

/// Tests whether `acronym` matches the ordered initials of `full_name`'s
/// normalized tokens, optionally after stripping one of the configured
/// variant suffixes (`ware`, `works`, ...) that often appear on one side
/// of an otherwise-matching acronym pair (e.g. "PAN" vs "Palo Alto
/// Networks" survives fine without this; "VMW" vs "VMware" needs it).
pub fn matches_acronym(config: &ResolverConfig, full_name: &str, acronym: &str) -> bool {
    let normalized_full = normalize(config, full_name);
    let acronym_normalized = normalize(config, acronym);

    if normalized_full.is_empty() || acronym_normalized.is_empty() {
        return false;
    }

    let initials: String = normalized_full
        .split_whitespace()
        .filter_map(|t| t.chars().next())
        .collect();

    if initials == acronym_normalized {
        return true;
    }

    for suffix in &config.acronym_variant_suffixes {
        if let Some(stripped) = acronym_normalized.strip_suffix(suffix.as_str()) {
            if stripped == initials {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResolverConfig {
        ResolverConfig::default()
    }

    #[test]
    fn normalize_strips_legal_suffix_and_punctuation() {
        let c = config();
        assert_eq!(normalize(&c, "Acme Corp."), "acme");
        assert_eq!(normalize(&c, "Beta & Sons, LLC"), "beta and sons");
    }

    #[test]
    fn normalize_drops_one_trailing_stopword_when_enough_tokens_remain() {
        let c = config();
        assert_eq!(normalize(&c, "Palo Alto Networks Technologies"), "palo alto networks");
        assert_eq!(normalize(&c, "Acme Technologies"), "acme technologies");
    }

    #[test]
    fn acronym_matches_initials_of_normalized_tokens() {
        let c = config();
        assert!(matches_acronym(&c, "Palo Alto Networks", "PAN"));
        assert!(!matches_acronym(&c, "Palo Alto Networks", "XYZ"));
    }

    #[test]
    fn acronym_variant_suffix_is_stripped_before_matching() {
        let c = config();
        assert!(matches_acronym(&c, "Cloud Orchestration", "CoWorks"));
        assert!(!matches_acronym(&c, "Cloud Orchestration", "XyzWorks"));
    }
}
