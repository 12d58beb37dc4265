use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use sentineldesk_common::error::{PipelineError, Result};
use sentineldesk_common::types::{Patent, PatentIngestStats};
use serde::Deserialize;
use std::time::{Duration as StdDuration, Instant};

/// CPC prefixes treated as the cybersecurity domain glob
/// (`H04L*`, `G06F21*`, `H04W12*`, `H04L9*`).
pub const SECURITY_CPC_PREFIXES: [&str; 4] = ["H04L", "G06F21", "H04W12", "H04L9"];

pub fn matches_security_domain(cpc_codes: &[String]) -> bool {
    cpc_codes
        .iter()
        .any(|code| SECURITY_CPC_PREFIXES.iter().any(|p| code.starts_with(p)))
}

/// Builds the warehouse query for a date window and country set. The
/// query text itself is warehouse-specific (BigQuery-flavored SQL in the
/// reference system); this crate only needs it to be a deterministic
/// function of its inputs so a given window always asks the same question.
pub struct PatentQueryBuilder {
    pub countries: Vec<String>,
}

impl PatentQueryBuilder {
    pub fn new(countries: Vec<String>) -> Self {
        Self { countries }
    }

    pub fn build_query(&self, start: NaiveDate, end: NaiveDate) -> String {
        let countries_filter = self
            .countries
            .iter()
            .map(|c| format!("'{c}'"))
            .collect::<Vec<_>>()
            .join(",");
        let cpc_clauses = SECURITY_CPC_PREFIXES
            .iter()
            .map(|p| format!("c.code LIKE '{p}%'"))
            .collect::<Vec<_>>()
            .join(" OR ");

        format!(
            "SELECT publication_number, title, abstract, filing_date, publication_date, \
             country_code, kind_code, assignees, inventors, cpc_codes \
             FROM patents WHERE filing_date BETWEEN '{}' AND '{}' \
             AND country_code IN ({}) AND EXISTS (SELECT 1 FROM UNNEST(cpc) AS c WHERE {}) \
             ORDER BY publication_date DESC LIMIT 1000",
            start, end, countries_filter, cpc_clauses
        )
    }
}

#[async_trait]
pub trait PatentSource: Send + Sync {
    async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> Result<(Vec<Patent>, PatentIngestStats)>;
}

#[derive(Deserialize)]
struct WarehouseResponse {
    rows: Vec<Patent>,
    #[serde(default)]
    bytes_processed: u64,
}

/// HTTP-backed patent source. Treats the warehouse as a JSON query
/// endpoint: POST the built query, parse the row set into `Patent`s,
/// drop anything failing `P-valid` or the security-domain CPC filter.
pub struct WarehousePatentSource {
    http: reqwest::Client,
    endpoint: String,
    query_builder: PatentQueryBuilder,
    min_patents: usize,
    query_timeout: StdDuration,
}

impl WarehousePatentSource {
    pub fn new(endpoint: String, countries: Vec<String>, min_patents: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            query_builder: PatentQueryBuilder::new(countries),
            min_patents,
            query_timeout: StdDuration::from_secs(30),
        }
    }

    async fn run_query_and_parse(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<Patent>, u64, u64)> {
        let query = self.query_builder.build_query(start, end);
        let t0 = Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.query_timeout)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| PipelineError::Source(format!("warehouse transport error: {e}")))?;

        let body: WarehouseResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Source(format!("warehouse response parse error: {e}")))?;

        let query_time_ms = t0.elapsed().as_millis() as u64;

        let patents: Vec<Patent> = body
            .rows
            .into_iter()
            .filter(|p| p.is_valid_minimal() && matches_security_domain(&p.cpc_codes))
            .collect();

        Ok((patents, body.bytes_processed, query_time_ms))
    }
}

#[async_trait]
impl PatentSource for WarehousePatentSource {
    /// Queries the primary window; if it yields fewer than `min_patents`,
    /// widens to a 30-day lookback and retries exactly once. Both windows
    /// are preserved in `PatentIngestStats` rather than the fallback
    /// silently overwriting the primary one, and a failed fallback is
    /// recorded rather than swallowed.
    async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> Result<(Vec<Patent>, PatentIngestStats)> {
        let mut stats = PatentIngestStats {
            primary_window: Some((start, end)),
            ..Default::default()
        };

        let (mut patents, mut bytes_processed, mut query_time_ms) =
            self.run_query_and_parse(start, end).await?;

        if patents.len() < self.min_patents {
            let fallback_start = end - Duration::days(30);
            match self.run_query_and_parse(fallback_start, end).await {
                Ok((fb_patents, fb_bytes, fb_time)) => {
                    stats.fallback_window = Some((fallback_start, end));
                    patents = fb_patents;
                    bytes_processed += fb_bytes;
                    query_time_ms += fb_time;
                }
                Err(e) => {
                    stats.fallback_failed = Some(e.to_string());
                }
            }
        }

        if patents.is_empty() {
            return Err(PipelineError::Source(
                "no patents retrieved from warehouse".to_string(),
            ));
        }

        stats.patents_fetched = patents.len();
        stats.bytes_processed = bytes_processed;
        stats.query_time_ms = query_time_ms;

        Ok((patents, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_domain_filter_matches_exact_prefixes() {
        assert!(matches_security_domain(&["H04L9/08".to_string()]));
        assert!(matches_security_domain(&["G06F21/62".to_string()]));
        assert!(!matches_security_domain(&["A61B5/00".to_string()]));
    }

    #[test]
    fn query_builder_is_deterministic() {
        let builder = PatentQueryBuilder::new(vec!["US".to_string()]);
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert_eq!(builder.build_query(start, end), builder.build_query(start, end));
    }
}
