use sentineldesk_common::error::PipelineError;
use sentineldesk_common::types::RelevanceResult;

use super::{retry_transient, source_type_str, PersistenceClient, UpsertReport};

impl PersistenceClient {
    /// Idempotent upsert keyed by `(item_id, source_type, model, model_version, ts)`.
    pub async fn upsert_relevance_results(&self, rows: &[RelevanceResult]) -> Result<UpsertReport, PipelineError> {
        if rows.is_empty() {
            return Ok(UpsertReport::empty());
        }

        for chunk in rows.chunks(self.batch_size()) {
            retry_transient(&self.config, "upsert_relevance_results", || async {
                let mut tx = self.pool().begin().await?;
                for result in chunk {
                    sqlx::query(
                        r#"
                        INSERT INTO relevance_results (
                            item_id, source_type, model, model_version, ts,
                            is_relevant, score, category, reasons, fingerprint
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                        ON CONFLICT (item_id, source_type, model, model_version, ts) DO UPDATE SET
                            is_relevant = excluded.is_relevant,
                            score = excluded.score,
                            category = excluded.category,
                            reasons = excluded.reasons,
                            fingerprint = excluded.fingerprint
                        "#,
                    )
                    .bind(&result.item_id)
                    .bind(source_type_str(result.source_type))
                    .bind(&result.model)
                    .bind(&result.model_version)
                    .bind(result.timestamp)
                    .bind(result.is_relevant)
                    .bind(result.score)
                    .bind(result.category.as_str())
                    .bind(serde_json::to_value(&result.reasons).unwrap_or_default())
                    .bind(&result.fingerprint)
                    .execute(&mut *tx)
                    .await?;
                }
                tx.commit().await
            })
            .await?;
        }

        Ok(UpsertReport::ok(rows.len()))
    }
}
