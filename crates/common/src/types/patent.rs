use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A patent record as returned by the document source adapter.
///
/// Created once per run by C1 and never mutated thereafter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Patent {
    pub publication_number: String,
    pub title: String,
    /// Named `abstract_text` because `abstract` is a reserved word.
    pub abstract_text: String,
    pub filing_date: Option<NaiveDate>,
    pub publication_date: Option<NaiveDate>,
    pub assignees: Vec<String>,
    pub inventors: Vec<String>,
    pub cpc_codes: Vec<String>,
    pub country: Option<String>,
    pub kind_code: Option<String>,
}

impl Patent {
    /// `P-valid`: non-empty id, title >= 10 chars, abstract >= 50 chars,
    /// at least one CPC code. Items failing this are dropped by C1 before
    /// they ever reach the DAG.
    pub fn is_valid_minimal(&self) -> bool {
        !self.publication_number.is_empty()
            && self.title.chars().count() >= 10
            && self.abstract_text.chars().count() >= 50
            && !self.cpc_codes.is_empty()
    }
}

/// Per-run ingestion statistics for the patent source, kept separate from
/// the records themselves. `fallback_window`/`fallback_failed` exist so a
/// widened-lookback retry never silently overwrites the original window
/// (see the patent source's fallback-widening behavior).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PatentIngestStats {
    pub patents_fetched: usize,
    pub bytes_processed: u64,
    pub query_time_ms: u64,
    pub primary_window: Option<(NaiveDate, NaiveDate)>,
    pub fallback_window: Option<(NaiveDate, NaiveDate)>,
    pub fallback_failed: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_patent() -> Patent {
        Patent {
            publication_number: "US-1234567-A1".to_string(),
            title: "Method for secure network traffic analysis".to_string(),
            abstract_text: "A system and method for analyzing network traffic to detect \
                intrusion attempts using machine learning classifiers."
                .to_string(),
            filing_date: None,
            publication_date: None,
            assignees: vec!["Acme Corp".to_string()],
            inventors: vec![],
            cpc_codes: vec!["H04L63/1416".to_string()],
            country: Some("US".to_string()),
            kind_code: Some("A1".to_string()),
        }
    }

    #[test]
    fn valid_patent_passes() {
        assert!(valid_patent().is_valid_minimal());
    }

    #[test]
    fn missing_cpc_code_fails() {
        let mut p = valid_patent();
        p.cpc_codes.clear();
        assert!(!p.is_valid_minimal());
    }

    #[test]
    fn short_abstract_fails() {
        let mut p = valid_patent();
        p.abstract_text = "too short".to_string();
        assert!(!p.is_valid_minimal());
    }

    #[test]
    fn empty_id_fails() {
        let mut p = valid_patent();
        p.publication_number.clear();
        assert!(!p.is_valid_minimal());
    }
}
