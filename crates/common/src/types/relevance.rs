use crate::ids::sha256_hex16;
use crate::types::category::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which document-source variant a classification result was produced for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Patent,
    Article,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Patent => "patent",
            SourceType::Article => "article",
        }
    }
}

/// Output of the relevance tier of the two-tier classifier (C4/P2).
///
/// Composite identity is `(item_id, source_type, model, model_version,
/// timestamp)`; produced exactly once per `(item, model+version)` per run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelevanceResult {
    pub item_id: String,
    pub source_type: SourceType,
    pub model: String,
    pub model_version: String,
    pub timestamp: DateTime<Utc>,
    pub is_relevant: bool,
    pub score: f64,
    pub category: Category,
    pub reasons: Vec<String>,
    pub fingerprint: String,
}

impl RelevanceResult {
    /// `score` is clamped to `[0, 1]` on construction so the invariant
    /// never needs re-checking downstream.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        item_id: String,
        source_type: SourceType,
        model: String,
        model_version: String,
        timestamp: DateTime<Utc>,
        is_relevant: bool,
        score: f64,
        category: Category,
        reasons: Vec<String>,
        normalized_context: &str,
    ) -> Self {
        Self {
            fingerprint: sha256_hex16(normalized_context),
            item_id,
            source_type,
            model,
            model_version,
            timestamp,
            is_relevant,
            score: score.clamp(0.0, 1.0),
            category,
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_clamped_into_unit_interval() {
        let r = RelevanceResult::new(
            "US-1".into(),
            SourceType::Patent,
            "heuristic-v1".into(),
            "1".into(),
            Utc::now(),
            true,
            1.7,
            Category::Network,
            vec![],
            "ctx",
        );
        assert!((0.0..=1.0).contains(&r.score));
        assert_eq!(r.score, 1.0);
    }
}
