use sentineldesk_common::error::PipelineError;
use sentineldesk_common::types::Article;

use super::{retry_transient, PersistenceClient, UpsertReport};

impl PersistenceClient {
    /// Idempotent upsert keyed by `link`.
    pub async fn upsert_articles(&self, rows: &[Article]) -> Result<UpsertReport, PipelineError> {
        if rows.is_empty() {
            return Ok(UpsertReport::empty());
        }

        for chunk in rows.chunks(self.batch_size()) {
            retry_transient(&self.config, "upsert_articles", || async {
                let mut tx = self.pool().begin().await?;
                for article in chunk {
                    sqlx::query(
                        r#"
                        INSERT INTO articles (
                            link, article_id, source, title, published_at, summary,
                            content, categories, funding_hint, funding_reason
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                        ON CONFLICT (link) DO UPDATE SET
                            article_id = excluded.article_id,
                            source = excluded.source,
                            title = excluded.title,
                            published_at = excluded.published_at,
                            summary = excluded.summary,
                            content = excluded.content,
                            categories = excluded.categories,
                            funding_hint = excluded.funding_hint,
                            funding_reason = excluded.funding_reason
                        "#,
                    )
                    .bind(&article.link)
                    .bind(article.id.as_str())
                    .bind(&article.source)
                    .bind(&article.title)
                    .bind(article.published_at)
                    .bind(&article.summary)
                    .bind(&article.content)
                    .bind(serde_json::to_value(&article.categories).unwrap_or_default())
                    .bind(article.funding_hint)
                    .bind(&article.funding_reason)
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
