use sentineldesk_common::error::PipelineError;
use sentineldesk_common::types::{AliasLink, ResolvedEntity};

use super::{retry_transient, PersistenceClient, UpsertReport};

impl PersistenceClient {
    /// Idempotent upsert keyed by `entity_id`.
    pub async fn upsert_entities(&self, rows: &[ResolvedEntity]) -> Result<UpsertReport, PipelineError> {
        if rows.is_empty() {
            return Ok(UpsertReport::empty());
        }

        for chunk in rows.chunks(self.batch_size()) {
            retry_transient(&self.config, "upsert_entities", || async {
                let mut tx = self.pool().begin().await?;
                for entity in chunk {
                    sqlx::query(
                        r#"
                        INSERT INTO entities (entity_id, canonical_name, aliases, sources, confidence, created_at)
                        VALUES ($1, $2, $3, $4, $5, $6)
                        ON CONFLICT (entity_id) DO UPDATE SET
                            canonical_name = excluded.canonical_name,
                            aliases = excluded.aliases,
                            sources = excluded.sources,
                            confidence = excluded.confidence
                        "#,
                    )
                    .bind(entity.entity_id.as_str())
                    .bind(&entity.canonical_name)
                    .bind(serde_json::to_value(&entity.aliases).unwrap_or_default())
                    .bind(serde_json::to_value(&entity.sources).unwrap_or_default())
                    .bind(entity.confidence)
                    .bind(entity.created_at)
                    .execute(&mut *tx)
                    .await?;
                }
                tx.commit().await
            })
            .await?;
        }

        Ok(UpsertReport::ok(rows.len()))
    }

    /// Idempotent upsert keyed by `raw_name`.
    pub async fn upsert_alias_links(&self, rows: &[AliasLink]) -> Result<UpsertReport, PipelineError> {
        if rows.is_empty() {
            return Ok(UpsertReport::empty());
        }

        for chunk in rows.chunks(self.batch_size()) {
            retry_transient(&self.config, "upsert_alias_links", || async {
                let mut tx = self.pool().begin().await?;
                for link in chunk {
                    sqlx::query(
                        r#"
                        INSERT INTO alias_links (raw_name, canonical_name, entity_id, score, rules_applied)
                        VALUES ($1, $2, $3, $4, $5)
                        ON CONFLICT (raw_name) DO UPDATE SET
                            canonical_name = excluded.canonical_name,
                            entity_id = excluded.entity_id,
                            score = excluded.score,
                            rules_applied = excluded.rules_applied
                        "#,
                    )
                    .bind(&link.raw_name)
                    .bind(&link.canonical_name)
                    .bind(link.entity_id.as_str())
                    .bind(link.score)
                    .bind(serde_json::to_value(&link.rules_applied).unwrap_or_default())
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
