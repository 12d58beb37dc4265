use sentineldesk_common::error::PipelineError;
use sentineldesk_common::types::ExtractionResult;

use super::{retry_transient, source_type_str, PersistenceClient, UpsertReport};

impl PersistenceClient {
    /// Idempotent upsert keyed by `(item_id, source_type, model, model_version, ts)`.
    pub async fn upsert_extraction_results(&self, rows: &[ExtractionResult]) -> Result<UpsertReport, PipelineError> {
        if rows.is_empty() {
            return Ok(UpsertReport::empty());
        }

        for chunk in rows.chunks(self.batch_size()) {
            retry_transient(&self.config, "upsert_extraction_results", || async {
                let mut tx = self.pool().begin().await?;
                for result in chunk {
                    sqlx::query(
                        r#"
                        INSERT INTO extraction_results (
                            item_id, source_type, model, model_version, ts,
                            company_names, sector, novelty_score, tech_keywords, rationale, fingerprint
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                        ON CONFLICT (item_id, source_type, model, model_version, ts) DO UPDATE SET
                            company_names = excluded.company_names,
                            sector = excluded.sector,
                            novelty_score = excluded.novelty_score,
                            tech_keywords = excluded.tech_keywords,
                            rationale = excluded.rationale,
                            fingerprint = excluded.fingerprint
                        "#,
                    )
                    .bind(&result.item_id)
                    .bind(source_type_str(result.source_type))
                    .bind(&result.model)
                    .bind(&result.model_version)
                    .bind(result.timestamp)
                    .bind(serde_json::to_value(&result.company_names).unwrap_or_default())
                    .bind(result.sector.as_str())
                    .bind(result.novelty_score)
                    .bind(serde_json::to_value(&result.tech_keywords).unwrap_or_default())
                    .bind(serde_json::to_value(&result.rationale).unwrap_or_default())
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
