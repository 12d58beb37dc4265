use thiserror::Error;

/// Failure taxonomy for the rate-limited oracle client (C2).
///
/// Surfaces as a fallback to the deterministic heuristic inside the
/// classifier; it only escapes to `PipelineError` when fallback is disabled.
#[derive(Clone, Debug, Error)]
pub enum OracleError {
    #[error("prompt rejected by input guard: {0}")]
    BadRequest(String),

    #[error("rate limit budget exhausted after retries")]
    RateExhausted,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl OracleError {
    /// Errors that retrying the same request will not fix.
    pub fn is_non_retryable(&self) -> bool {
        matches!(self, Self::BadRequest(_) | Self::MalformedResponse(_))
    }
}

/// Top-level error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("preflight check failed: {0}")]
    Preflight(String),

    #[error("document source error: {0}")]
    Source(String),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("classification error for item {item_id}: {message}")]
    Classification { item_id: String, message: String },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("run budget exceeded after {elapsed_secs}s (limit {limit_secs}s)")]
    BudgetExceeded { elapsed_secs: u64, limit_secs: u64 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(String),

    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    /// Whether this error must abort the run before/independent of the DAG
    /// (ConfigError / PreflightError / BudgetExceeded per the error design).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Preflight(_) | Self::BudgetExceeded { .. }
        )
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
