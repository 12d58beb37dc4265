use crate::types::category::Category;
use crate::types::relevance::SourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of the extraction tier of the two-tier classifier (C4/P3).
///
/// Shares the same composite identity shape as `RelevanceResult`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub item_id: String,
    pub source_type: SourceType,
    pub model: String,
    pub model_version: String,
    pub timestamp: DateTime<Utc>,
    pub company_names: Vec<String>,
    pub sector: Category,
    pub novelty_score: f64,
    pub tech_keywords: Vec<String>,
    pub rationale: Vec<String>,
    pub fingerprint: String,
}

const MAX_COMPANY_NAMES: usize = 5;
const MAX_TECH_KEYWORDS: usize = 10;
const MAX_RATIONALE: usize = 4;

impl ExtractionResult {
    /// Applies every cap/clamp the invariants require in one place, so a
    /// caller can never construct a result that already violates §8:
    /// `company_names` deduped case-insensitively and capped at 5,
    /// `tech_keywords` deduped/lowercased and capped at 10, `novelty_score`
    /// clamped to `[0,1]`, `rationale` capped at 4.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        item_id: String,
        source_type: SourceType,
        model: String,
        model_version: String,
        timestamp: DateTime<Utc>,
        company_names: Vec<String>,
        sector: Category,
        novelty_score: f64,
        tech_keywords: Vec<String>,
        rationale: Vec<String>,
        fingerprint: String,
    ) -> Self {
        Self {
            item_id,
            source_type,
            model,
            model_version,
            timestamp,
            company_names: dedup_case_insensitive(company_names, MAX_COMPANY_NAMES),
            sector,
            novelty_score: novelty_score.clamp(0.0, 1.0),
            tech_keywords: dedup_lowercase(tech_keywords, MAX_TECH_KEYWORDS),
            rationale: rationale.into_iter().take(MAX_RATIONALE).collect(),
            fingerprint,
        }
    }
}

fn dedup_case_insensitive(items: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let key = item.to_lowercase();
        if seen.insert(key) {
            out.push(item);
            if out.len() == cap {
                break;
            }
        }
    }
    out
}

fn dedup_lowercase(items: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let lower = item.to_lowercase();
        if seen.insert(lower.clone()) {
            out.push(lower);
            if out.len() == cap {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(company_names: Vec<&str>, tech_keywords: Vec<&str>) -> ExtractionResult {
        ExtractionResult::new(
            "US-1".into(),
            SourceType::Patent,
            "heuristic-v1".into(),
            "1".into(),
            Utc::now(),
            company_names.into_iter().map(String::from).collect(),
            Category::Network,
            0.5,
            tech_keywords.into_iter().map(String::from).collect(),
            vec![],
            "fp".into(),
        )
    }

    #[test]
    fn company_names_are_capped_and_deduped_case_insensitively() {
        let r = build(
            vec!["Acme", "ACME", "Beta", "Gamma", "Delta", "Epsilon", "Zeta"],
            vec![],
        );
        assert_eq!(r.company_names.len(), 5);
        assert_eq!(r.company_names[0], "Acme");
    }

    #[test]
    fn tech_keywords_are_lowercased_deduped_and_capped() {
        let r = build(vec![], vec!["TLS", "tls", "mTLS"]);
        assert_eq!(r.tech_keywords, vec!["tls".to_string(), "mtls".to_string()]);
    }
}
