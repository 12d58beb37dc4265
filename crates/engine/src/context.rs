use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use sentineldesk_common::config::RunMode;
use sentineldesk_common::ids::CorrelationId;

/// A single logged failure, kept alongside the run's statistics for the
/// final summary and for DLQ cross-referencing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunError {
    pub node: String,
    pub message: String,
    pub item_id: Option<String>,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Tracks execution state, statistics, and errors for a single engine run.
///
/// One `RunContext` is created per invocation and threaded through every
/// DAG node; nodes record their own counters and failures into it rather
/// than returning ad hoc result structs, so the final summary reflects the
/// whole run regardless of which nodes ran or were skipped.
pub struct RunContext {
    pub correlation_id: CorrelationId,
    pub run_mode: RunMode,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_dry_run: bool,
    time_budget_minutes: u64,
    started_at: Instant,
    started_at_utc: chrono::DateTime<Utc>,
    stats: Mutex<HashMap<String, u64>>,
    errors: Mutex<Vec<RunError>>,
    results: Mutex<HashMap<String, serde_json::Value>>,
}

impl RunContext {
    pub fn new(run_mode: RunMode, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            is_dry_run: matches!(run_mode, RunMode::DryRun),
            run_mode,
            start_date,
            end_date,
            time_budget_minutes: 15,
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
            stats: Mutex::new(HashMap::new()),
            errors: Mutex::new(Vec::new()),
            results: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the default wall-clock budget. Nodes are skipped rather
    /// than started once `time_budget_exceeded` trips against this value.
    pub fn with_time_budget(mut self, minutes: u64) -> Self {
        self.time_budget_minutes = minutes;
        self
    }

    pub fn time_budget_minutes(&self) -> u64 {
        self.time_budget_minutes
    }

    /// Stashes a node's output for downstream nodes to read back via
    /// `get_result`. Serialized through JSON so nodes stay decoupled from
    /// each other's concrete types, matching the cache's approach to
    /// shared state.
    pub fn set_result<T: serde::Serialize>(&self, node: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.results.lock().expect("results mutex poisoned").insert(node.to_string(), v);
            }
            Err(e) => tracing::error!(node, error = %e, "failed to stash node result"),
        }
    }

    pub fn get_result<T: serde::de::DeserializeOwned>(&self, node: &str) -> Option<T> {
        let results = self.results.lock().expect("results mutex poisoned");
        results.get(node).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn increment(&self, key: &str, count: u64) {
        let mut stats = self.stats.lock().expect("stats mutex poisoned");
        *stats.entry(key.to_string()).or_insert(0) += count;
    }

    pub fn get_stat(&self, key: &str) -> u64 {
        self.stats
            .lock()
            .expect("stats mutex poisoned")
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn add_error(&self, node: &str, message: impl Into<String>, item_id: Option<String>) {
        let err = RunError {
            node: node.to_string(),
            message: message.into(),
            item_id,
            timestamp: Utc::now(),
        };
        self.errors.lock().expect("errors mutex poisoned").push(err);
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().expect("errors mutex poisoned").len()
    }

    pub fn errors_snapshot(&self) -> Vec<RunError> {
        self.errors.lock().expect("errors mutex poisoned").clone()
    }

    pub fn get_duration_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    pub fn time_budget_exceeded(&self) -> bool {
        self.get_duration_seconds() >= (self.time_budget_minutes as f64) * 60.0
    }

    pub fn summary(&self) -> String {
        let duration = self.get_duration_seconds();
        let errors = self.error_count();
        format!(
            "Run {}: {:?} mode, {} to {}, {:.1}s, {} errors",
            &self.correlation_id.to_string()[..8],
            self.run_mode,
            self.start_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
            self.end_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
            duration,
            errors,
        )
    }

    pub fn started_at_utc(&self) -> chrono::DateTime<Utc> {
        self.started_at_utc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accumulate_across_increments() {
        let ctx = RunContext::new(RunMode::Incremental, None, None);
        ctx.increment("articles_fetched", 3);
        ctx.increment("articles_fetched", 2);
        assert_eq!(ctx.get_stat("articles_fetched"), 5);
        assert_eq!(ctx.get_stat("unknown_key"), 0);
    }

    #[test]
    fn errors_are_recorded_with_node_and_item() {
        let ctx = RunContext::new(RunMode::Incremental, None, None);
        ctx.add_error("p2_relevance", "classification failed", Some("abc123".into()));
        let errors = ctx.errors_snapshot();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].node, "p2_relevance");
        assert_eq!(errors[0].item_id.as_deref(), Some("abc123"));
    }
}
