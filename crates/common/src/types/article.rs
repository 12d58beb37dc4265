use crate::ids::ArticleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A news article as returned by the document source adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub source: String,
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    /// May contain markup; the classifier context builder strips it.
    pub summary: String,
    pub content: Option<String>,
    pub categories: Vec<String>,
    pub funding_hint: bool,
    pub funding_reason: Option<String>,
    /// Raw feed-entry bag for diagnostics; never persisted.
    #[serde(skip)]
    pub raw: HashMap<String, String>,
}

impl Article {
    /// Id = stable 16-hex digest of `source:link`.
    pub fn new(
        source: String,
        title: String,
        link: String,
        published_at: DateTime<Utc>,
        summary: String,
    ) -> Self {
        let id = ArticleId::from_seed(&format!("{source}:{link}"));
        Self {
            id,
            source,
            title,
            link,
            published_at,
            summary,
            content: None,
            categories: Vec::new(),
            funding_hint: false,
            funding_reason: None,
            raw: HashMap::new(),
        }
    }

    /// `A-valid`: non-empty title and link, published within the run's
    /// lookback window.
    pub fn is_valid(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> bool {
        !self.title.is_empty()
            && !self.link.is_empty()
            && self.published_at >= window_start
            && self.published_at <= window_end
    }
}

/// Per-run ingestion statistics for the article source, kept separate from
/// the records themselves.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ArticleIngestStats {
    pub feeds_processed: usize,
    pub feeds_failed: usize,
    pub articles_fetched: usize,
    pub bytes_processed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn id_is_deterministic_function_of_source_and_link() {
        let now = Utc::now();
        let a = Article::new(
            "feed-a".into(),
            "Title".into(),
            "https://example.com/x".into(),
            now,
            "summary".into(),
        );
        let b = Article::new(
            "feed-a".into(),
            "Different title".into(),
            "https://example.com/x".into(),
            now,
            "different summary".into(),
        );
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn validity_respects_lookback_window() {
        let now = Utc::now();
        let article = Article::new(
            "feed-a".into(),
            "Title".into(),
            "https://example.com/x".into(),
            now - Duration::days(10),
            "summary".into(),
        );
        assert!(!article.is_valid(now - Duration::days(2), now));
        assert!(article.is_valid(now - Duration::days(30), now));
    }
}
