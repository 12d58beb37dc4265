use std::collections::HashSet;

use sentineldesk_common::config::ResolverConfig;

use super::normalize;

#[derive(Debug, Clone, Copy)]
pub struct SimilarityComponents {
    pub jaccard: f64,
    pub edit: f64,
    pub jaro_winkler: f64,
    pub acronym: f64,
    pub composite: f64,
}

pub fn token_jaccard(tokens1: &HashSet<String>, tokens2: &HashSet<String>) -> f64 {
    if tokens1.is_empty() && tokens2.is_empty() {
        return 1.0;
    }
    if tokens1.is_empty() || tokens2.is_empty() {
        return 0.0;
    }
    let intersection = tokens1.intersection(tokens2).count();
    let union = tokens1.union(tokens2).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

pub fn edit_distance_ratio(str1: &str, str2: &str) -> f64 {
    if str1.is_empty() && str2.is_empty() {
        return 1.0;
    }
    if str1.is_empty() || str2.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(str1, str2)
}

pub fn jaro_winkler(str1: &str, str2: &str) -> f64 {
    if str1.is_empty() && str2.is_empty() {
        return 1.0;
    }
    if str1.is_empty() || str2.is_empty() {
        return 0.0;
    }
    strsim::jaro_winkler(str1, str2)
}

/// Checks both directions of an acronym match (either name could be the
/// short form) and both directions of acronym-expansion equivalence.
pub fn acronym_score(config: &ResolverConfig, name1: &str, name2: &str) -> f64 {
    if normalize::matches_acronym(config, name1, name2) || normalize::matches_acronym(config, name2, name1) {
        return 1.0;
    }

    let expanded1 = normalize::expand_acronym(config, name1);
    let expanded2 = normalize::expand_acronym(config, name2);
    let norm1 = normalize::normalize(config, name1);
    let norm2 = normalize::normalize(config, name2);

    if expanded1 != norm1 || expanded2 != norm2 {
        if expanded1 == expanded2 {
            return 1.0;
        }
        if normalize::normalize(config, &expanded1) == norm2 {
            return 1.0;
        }
        if normalize::normalize(config, &expanded2) == norm1 {
            return 1.0;
        }
    }

    0.0
}

pub fn composite_score(config: &ResolverConfig, name1: &str, name2: &str) -> SimilarityComponents {
    let norm1 = normalize::normalize(config, name1);
    let norm2 = normalize::normalize(config, name2);
    let tokens1 = normalize::extract_tokens(config, name1);
    let tokens2 = normalize::extract_tokens(config, name2);

    let jaccard = token_jaccard(&tokens1, &tokens2);
    let edit = edit_distance_ratio(&norm1, &norm2);
    let jw = jaro_winkler(&norm1, &norm2);
    let acronym = acronym_score(config, name1, name2);

    let composite = config.weight_jaccard * jaccard
        + config.weight_edit * edit
        + config.weight_jaro_winkler * jw
        + config.weight_acronym * acronym;

    SimilarityComponents {
        jaccard,
        edit,
        jaro_winkler: jw,
        acronym,
        composite,
    }
}

#[derive(Debug, Clone)]
pub struct MatchDecision {
    pub is_match: bool,
    pub score: f64,
    pub rules_applied: Vec<String>,
}

/// Two-threshold match decision: scores at or above `hard_match_threshold`
/// match outright; scores in the soft band only match with a corroborating
/// signal (acronym match, high token overlap, or very high edit similarity).
pub fn is_match(config: &ResolverConfig, name1: &str, name2: &str) -> MatchDecision {
    let components = composite_score(config, name1, name2);
    let score = components.composite;

    if score >= config.hard_match_threshold {
        return MatchDecision {
            is_match: true,
            score,
            rules_applied: vec!["hard_match".to_string()],
        };
    }

    if score >= config.soft_match_threshold {
        if components.acronym == 1.0 {
            return MatchDecision {
                is_match: true,
                score,
                rules_applied: vec!["soft_match_with_acronym".to_string()],
            };
        }
        if components.jaccard >= 0.8 {
            return MatchDecision {
                is_match: true,
                score,
                rules_applied: vec!["soft_match_with_high_token_overlap".to_string()],
            };
        }
        if components.edit >= 0.9 {
            return MatchDecision {
                is_match: true,
                score,
                rules_applied: vec!["soft_match_with_high_edit_similarity".to_string()],
            };
        }
        return MatchDecision {
            is_match: false,
            score,
            rules_applied: vec!["soft_match_no_corroboration".to_string()],
        };
    }

    MatchDecision {
        is_match: false,
        score,
        rules_applied: vec!["no_match".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResolverConfig {
        ResolverConfig::default()
    }

    #[test]
    fn identical_names_hard_match() {
        let c = config();
        let decision = is_match(&c, "Acme Security Inc.", "Acme Security Inc");
        assert!(decision.is_match);
        assert_eq!(decision.rules_applied, vec!["hard_match".to_string()]);
    }

    #[test]
    fn unrelated_names_do_not_match() {
        let c = config();
        let decision = is_match(&c, "Acme Security", "Totally Different Widgets");
        assert!(!decision.is_match);
    }

    #[test]
    fn acronym_corroborates_a_soft_match() {
        let c = config();
        let decision = is_match(&c, "Palo Alto Networks", "PAN");
        assert!(decision.score >= c.soft_match_threshold);
    }
}
