use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level system configuration, deserialized from `system.toml` and
/// overridden by the environment variables in the external-interfaces
/// surface (`RUN_MODE`, `LOOKBACK_DAYS`, `P2_CONCURRENCY`, ...).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemConfig {
    pub run: RunConfig,
    pub concurrency: ConcurrencyConfig,
    pub oracle: OracleConfig,
    pub cache: CacheConfig,
    pub classifier: ClassifierConfig,
    pub resolver: ResolverConfig,
    pub dlq: DlqConfig,
    pub persistence: PersistenceConfig,
    pub sources: SourcesConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            run: RunConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            oracle: OracleConfig::default(),
            cache: CacheConfig::default(),
            classifier: ClassifierConfig::default(),
            resolver: ResolverConfig::default(),
            dlq: DlqConfig::default(),
            persistence: PersistenceConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

/// One RSS/Atom feed the article source polls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedSourceConfig {
    pub name: String,
    pub url: String,
}

/// Document source configuration (C1): the warehouse endpoint patents are
/// pulled from and the feed list articles are pulled from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub warehouse_endpoint: String,
    pub patent_countries: Vec<String>,
    pub min_patents: usize,
    pub feeds: Vec<FeedSourceConfig>,
    pub article_max_per_feed: usize,
    pub article_fetch_content: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            warehouse_endpoint: "https://warehouse.internal/query".to_string(),
            patent_countries: vec!["US".to_string(), "EP".to_string(), "WO".to_string()],
            min_patents: 50,
            feeds: vec![
                FeedSourceConfig {
                    name: "krebs-on-security".to_string(),
                    url: "https://krebsonsecurity.com/feed/".to_string(),
                },
                FeedSourceConfig {
                    name: "the-hacker-news".to_string(),
                    url: "https://feeds.feedburner.com/TheHackersNews".to_string(),
                },
                FeedSourceConfig {
                    name: "bleeping-computer".to_string(),
                    url: "https://www.bleepingcomputer.com/feed/".to_string(),
                },
            ],
            article_max_per_feed: 200,
            article_fetch_content: false,
        }
    }
}

/// How the run is invoked: one bounded batch, never a streaming mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Incremental,
    Backfill,
    DryRun,
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::Incremental
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    pub mode: RunMode,
    /// Used by incremental and dry-run modes to derive the date window.
    pub lookback_days: i64,
    /// Required together when `mode == Backfill`.
    #[serde(default)]
    pub start_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub end_date: Option<chrono::NaiveDate>,
    pub time_budget_minutes: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Incremental,
            lookback_days: 2,
            start_date: None,
            end_date: None,
            time_budget_minutes: 15,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Worker pool size for the relevance fan-out stage (P2).
    pub p2_concurrency: usize,
    /// Worker pool size for the extraction fan-out stage (P3).
    pub p3_concurrency: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            p2_concurrency: 4,
            p3_concurrency: 4,
        }
    }
}

/// Oracle client configuration (C2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleConfig {
    pub provider: String,
    pub model: String,
    pub max_rpm: u32,
    pub max_retries: u32,
    pub max_prompt_chars: usize,
    pub api_key_env: String,
    /// Callers that pre-sanitize input may set `trusted=true` to skip the
    /// banned-substring guard; this is the process-wide default.
    pub trusted_default: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-flash".to_string(),
            max_rpm: 15,
            max_retries: 3,
            max_prompt_chars: 10_000,
            api_key_env: "GEMINI_API_KEY".to_string(),
            trusted_default: false,
        }
    }
}

/// Classifier cache TTL configuration (C3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 3600 }
    }
}

/// Two-tier classifier configuration (C4).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub relevance_threshold: f64,
    pub relevance_context_chars: usize,
    pub extraction_context_chars: usize,
    pub use_llm: bool,
    pub fallback_enabled: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.5,
            relevance_context_chars: 800,
            extraction_context_chars: 1200,
            use_llm: true,
            fallback_enabled: true,
        }
    }
}

/// How a cluster's representative alias is chosen (§9 Open Question ii).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStrategy {
    Longest,
    MostFrequent,
    HighestScore,
}

impl Default for CanonicalStrategy {
    fn default() -> Self {
        CanonicalStrategy::Longest
    }
}

/// Entity resolver configuration (C6), the constants table the normalizer,
/// blocker, similarity scorer and clusterer all read from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub hard_match_threshold: f64,
    pub soft_match_threshold: f64,
    pub weight_jaccard: f64,
    pub weight_edit: f64,
    pub weight_jaro_winkler: f64,
    pub weight_acronym: f64,
    pub min_block_size: usize,
    pub max_block_size: usize,
    pub max_cluster_size: usize,
    pub canonical_strategy: CanonicalStrategy,
    pub legal_suffixes: Vec<String>,
    pub two_token_legal_suffixes: Vec<String>,
    pub corporate_stopwords: Vec<String>,
    pub acronym_expansions: HashMap<String, String>,
    pub acronym_variant_suffixes: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let legal_suffixes = [
            "inc", "incorporated", "corp", "corporation", "ltd", "limited", "llc", "co",
            "company", "plc", "sa", "ag", "gmbh", "bv", "nv", "pte", "pty", "oy", "kk", "kft",
            "srl", "ab", "as", "spa", "kg",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let two_token_legal_suffixes = vec!["co kg".to_string(), "gmbh co kg".to_string()];

        let corporate_stopwords = [
            "technologies",
            "technology",
            "systems",
            "solutions",
            "holdings",
            "group",
            "international",
            "global",
            "services",
            "software",
            "labs",
            "laboratory",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let acronym_expansions = [
            ("pan", "palo alto networks"),
            ("vmw", "vmware"),
            ("csco", "cisco"),
            ("crwd", "crowdstrike"),
            ("ftnt", "fortinet"),
            ("panw", "palo alto networks"),
            ("zs", "zscaler"),
            ("okta", "okta"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let acronym_variant_suffixes = ["ware", "works", "ways", "wire", "worx"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        Self {
            hard_match_threshold: 0.88,
            soft_match_threshold: 0.70,
            weight_jaccard: 0.35,
            weight_edit: 0.25,
            weight_jaro_winkler: 0.15,
            weight_acronym: 0.25,
            min_block_size: 2,
            max_block_size: 1000,
            max_cluster_size: 20,
            canonical_strategy: CanonicalStrategy::default(),
            legal_suffixes,
            two_token_legal_suffixes,
            corporate_stopwords,
            acronym_expansions,
            acronym_variant_suffixes,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DlqConfig {
    pub enabled: bool,
    pub dir: std::path::PathBuf,
}

impl Default for DlqConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: std::path::PathBuf::from("dlq"),
        }
    }
}

/// Persistence sink batching/retry configuration (C7).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub batch_size: usize,
    pub max_batch_size: usize,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_batch_size: 1000,
            max_retries: 3,
            initial_backoff_ms: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_weights_sum_to_one() {
        let r = ResolverConfig::default();
        let sum = r.weight_jaccard + r.weight_edit + r.weight_jaro_winkler + r.weight_acronym;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn persistence_batch_size_respects_hard_cap() {
        let p = PersistenceConfig::default();
        assert!(p.batch_size <= p.max_batch_size);
    }
}
