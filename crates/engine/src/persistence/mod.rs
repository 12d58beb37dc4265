mod articles;
mod entities;
mod extraction;
mod patents;
mod relevance;

use std::future::Future;
use std::time::Duration;

use sentineldesk_common::error::PipelineError;
use sentineldesk_common::types::SourceType;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use sentineldesk_common::config::PersistenceConfig;

/// Outcome of one idempotent-upsert call, logged by the pipeline and
/// folded into the run summary. `count == 0 && success` on an empty
/// input slice — nothing is attempted and nothing is wrong.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UpsertReport {
    pub count: usize,
    pub success: bool,
    pub error: Option<String>,
}

impl UpsertReport {
    pub fn empty() -> Self {
        Self { count: 0, success: true, error: None }
    }

    fn ok(count: usize) -> Self {
        Self { count, success: true, error: None }
    }
}

/// Postgres-backed sink for every table the pipeline writes to (C7).
/// One client is shared across all persist nodes in a run.
pub struct PersistenceClient {
    pool: PgPool,
    config: PersistenceConfig,
}

impl PersistenceClient {
    pub async fn connect(database_url: &str, max_connections: u32, config: PersistenceConfig) -> Result<Self, PipelineError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| PipelineError::Preflight(format!("database connection failed: {e}")))?;

        let client = Self { pool, config };
        client.ensure_schema().await?;
        Ok(client)
    }

    pub async fn health_check(&self) -> Result<(), PipelineError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| PipelineError::Preflight(format!("persistence health check failed: {e}")))?;
        Ok(())
    }

    /// Creates every table if absent. There is no separate migrations
    /// directory — the schema is small and stable enough that
    /// idempotent `CREATE TABLE IF NOT EXISTS` on startup is simpler than
    /// a migration runner for a batch job with one writer.
    async fn ensure_schema(&self) -> Result<(), PipelineError> {
        let statements = [
            r#"CREATE TABLE IF NOT EXISTS patents (
                publication_number TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                abstract_text TEXT NOT NULL,
                filing_date DATE,
                publication_date DATE,
                assignees JSONB NOT NULL DEFAULT '[]',
                inventors JSONB NOT NULL DEFAULT '[]',
                cpc_codes JSONB NOT NULL DEFAULT '[]',
                country TEXT,
                kind_code TEXT
            )"#,
            r#"CREATE TABLE IF NOT EXISTS articles (
                link TEXT PRIMARY KEY,
                article_id TEXT NOT NULL,
                source TEXT NOT NULL,
                title TEXT NOT NULL,
                published_at TIMESTAMPTZ NOT NULL,
                summary TEXT NOT NULL,
                content TEXT,
                categories JSONB NOT NULL DEFAULT '[]',
                funding_hint BOOLEAN NOT NULL DEFAULT FALSE,
                funding_reason TEXT
            )"#,
            r#"CREATE TABLE IF NOT EXISTS relevance_results (
                item_id TEXT NOT NULL,
                source_type TEXT NOT NULL,
                model TEXT NOT NULL,
                model_version TEXT NOT NULL,
                ts TIMESTAMPTZ NOT NULL,
                is_relevant BOOLEAN NOT NULL,
                score DOUBLE PRECISION NOT NULL,
                category TEXT NOT NULL,
                reasons JSONB NOT NULL DEFAULT '[]',
                fingerprint TEXT NOT NULL,
                PRIMARY KEY (item_id, source_type, model, model_version, ts)
            )"#,
            r#"CREATE TABLE IF NOT EXISTS extraction_results (
                item_id TEXT NOT NULL,
                source_type TEXT NOT NULL,
                model TEXT NOT NULL,
                model_version TEXT NOT NULL,
                ts TIMESTAMPTZ NOT NULL,
                company_names JSONB NOT NULL DEFAULT '[]',
                sector TEXT NOT NULL,
                novelty_score DOUBLE PRECISION NOT NULL,
                tech_keywords JSONB NOT NULL DEFAULT '[]',
                rationale JSONB NOT NULL DEFAULT '[]',
                fingerprint TEXT NOT NULL,
                PRIMARY KEY (item_id, source_type, model, model_version, ts)
            )"#,
            r#"CREATE TABLE IF NOT EXISTS entities (
                entity_id TEXT PRIMARY KEY,
                canonical_name TEXT NOT NULL,
                aliases JSONB NOT NULL DEFAULT '[]',
                sources JSONB NOT NULL DEFAULT '[]',
                confidence DOUBLE PRECISION NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS alias_links (
                raw_name TEXT PRIMARY KEY,
                canonical_name TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                score DOUBLE PRECISION NOT NULL,
                rules_applied JSONB NOT NULL DEFAULT '[]'
            )"#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| PipelineError::Preflight(format!("schema setup failed: {e}")))?;
        }

        Ok(())
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size.min(self.config.max_batch_size)
    }
}

/// Runs `f` with exponential backoff (`initial_backoff_ms * 2^attempt`)
/// until it succeeds, a permanent error surfaces, or retries are
/// exhausted. Mirrors the oracle client's retry shape.
async fn retry_transient<F, Fut>(
    config: &PersistenceConfig,
    op_name: &str,
    mut f: F,
) -> Result<(), PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), sqlx::Error>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(()) => return Ok(()),
            Err(e) if is_permanent(&e) => {
                return Err(PipelineError::Persistence(format!("{op_name}: {e}")));
            }
            Err(e) if attempt >= config.max_retries => {
                return Err(PipelineError::Persistence(format!(
                    "{op_name} failed after {attempt} attempts: {e}"
                )));
            }
            Err(e) => {
                let backoff = Duration::from_millis(config.initial_backoff_ms * 2u64.pow(attempt.saturating_sub(1)));
                tracing::warn!(op = op_name, attempt, error = %e, "persistence operation failed, retrying");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// A schema mismatch (undefined column/table/type, Postgres class `42`)
/// will never succeed on retry; anything else (connection blips, locks,
/// deadlocks) is worth retrying.
fn is_permanent(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::ColumnNotFound(_) | sqlx::Error::TypeNotFound { .. } => true,
        sqlx::Error::Database(db) => db.code().map(|c| c.starts_with("42")).unwrap_or(false),
        _ => false,
    }
}

fn source_type_str(s: SourceType) -> &'static str {
    s.as_str()
}
