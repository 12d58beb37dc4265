use sentineldesk_common::error::PipelineError;
use sentineldesk_common::types::Patent;

use super::{retry_transient, PersistenceClient, UpsertReport};

impl PersistenceClient {
    /// Idempotent upsert keyed by `publication_number`.
    pub async fn upsert_patents(&self, rows: &[Patent]) -> Result<UpsertReport, PipelineError> {
        if rows.is_empty() {
            return Ok(UpsertReport::empty());
        }

        for chunk in rows.chunks(self.batch_size()) {
            retry_transient(&self.config, "upsert_patents", || async {
                let mut tx = self.pool().begin().await?;
                for patent in chunk {
                    sqlx::query(
                        r#"
                        INSERT INTO patents (
                            publication_number, title, abstract_text, filing_date,
                            publication_date, assignees, inventors, cpc_codes, country, kind_code
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                        ON CONFLICT (publication_number) DO UPDATE SET
                            title = excluded.title,
                            abstract_text = excluded.abstract_text,
                            filing_date = excluded.filing_date,
                            publication_date = excluded.publication_date,
                            assignees = excluded.assignees,
                            inventors = excluded.inventors,
                            cpc_codes = excluded.cpc_codes,
                            country = excluded.country,
                            kind_code = excluded.kind_code
                        "#,
                    )
                    .bind(&patent.publication_number)
                    .bind(&patent.title)
                    .bind(&patent.abstract_text)
                    .bind(patent.filing_date)
                    .bind(patent.publication_date)
                    .bind(serde_json::to_value(&patent.assignees).unwrap_or_default())
                    .bind(serde_json::to_value(&patent.inventors).unwrap_or_default())
                    .bind(serde_json::to_value(&patent.cpc_codes).unwrap_or_default())
                    .bind(&patent.country)
                    .bind(&patent.kind_code)
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
