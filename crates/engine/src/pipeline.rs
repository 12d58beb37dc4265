use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sentineldesk_common::config::{RunMode, SystemConfig};
use sentineldesk_common::types::{Article, Category, ExtractionResult, Patent, RelevanceResult};
use sentineldesk_sources::{ArticleSource, PatentSource};

use crate::classifier::Classifier;
use crate::context::RunContext;
use crate::dag::{Dag, DagError};
use crate::dlq::Dlq;
use crate::fanout;
use crate::persistence::PersistenceClient;
use crate::resolver::EntityResolver;

/// Everything a DAG node needs, bundled once at startup and shared via
/// `Arc` across every node closure.
pub struct PipelineServices {
    pub patent_source: Arc<dyn PatentSource>,
    pub article_source: Arc<dyn ArticleSource>,
    pub classifier: Arc<Classifier>,
    pub resolver: Arc<EntityResolver>,
    pub persistence: Arc<PersistenceClient>,
    pub dlq: Arc<Dlq>,
    pub config: SystemConfig,
}

/// Builds the full DAG: ingest -> persist -> relevance -> persist ->
/// extraction -> persist -> resolve -> persist, exactly as laid out by
/// the pipeline's data-flow section.
pub fn build_dag(services: Arc<PipelineServices>) -> Result<Dag, DagError> {
    let mut dag = Dag::new();

    macro_rules! node {
        ($name:literal, $deps:expr, $func:ident) => {{
            let services = Arc::clone(&services);
            dag.add_node($name, $deps, move |ctx| {
                let services = Arc::clone(&services);
                Box::pin(async move { $func(&services, ctx).await })
            })?;
        }};
    }

    node!("ingest_patents", &[], ingest_patents);
    node!("ingest_articles", &[], ingest_articles);
    node!("persist_patents", &["ingest_patents"], persist_patents);
    node!("persist_articles", &["ingest_articles"], persist_articles);
    node!("relevance_patents", &["persist_patents"], relevance_patents);
    node!("relevance_articles", &["persist_articles"], relevance_articles);
    node!(
        "persist_relevance",
        &["relevance_patents", "relevance_articles"],
        persist_relevance
    );
    node!("extraction_patents", &["persist_relevance"], extraction_patents);
    node!("extraction_articles", &["persist_relevance"], extraction_articles);
    node!(
        "persist_extraction",
        &["extraction_patents", "extraction_articles"],
        persist_extraction
    );
    node!("resolve_entities", &["persist_extraction"], resolve_entities);
    node!("persist_entities", &["resolve_entities"], persist_entities);

    Ok(dag)
}

fn patent_window(ctx: &RunContext, lookback_days: i64) -> (NaiveDate, NaiveDate) {
    match ctx.run_mode {
        RunMode::Backfill => (
            ctx.start_date.expect("validated at config load"),
            ctx.end_date.expect("validated at config load"),
        ),
        RunMode::Incremental | RunMode::DryRun => {
            let end = Utc::now().date_naive();
            (end - chrono::Duration::days(lookback_days), end)
        }
    }
}

fn article_lookback_days(ctx: &RunContext, configured_lookback: i64) -> i64 {
    match (ctx.run_mode, ctx.start_date, ctx.end_date) {
        (RunMode::Backfill, Some(start), Some(end)) => (end - start).num_days().max(1),
        _ => configured_lookback,
    }
}

async fn ingest_patents(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    let (start, end) = patent_window(ctx, services.config.run.lookback_days);
    let (patents, stats) = services
        .patent_source
        .fetch(start, end)
        .await
        .map_err(|e| e.to_string())?;

    ctx.increment("patents_fetched", patents.len() as u64);
    ctx.set_result("ingest_patents", &patents);
    ctx.set_result("ingest_patents_stats", &stats);
    Ok(())
}

async fn ingest_articles(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    let lookback = article_lookback_days(ctx, services.config.run.lookback_days);
    let (articles, stats) = services
        .article_source
        .fetch(lookback)
        .await
        .map_err(|e| e.to_string())?;

    ctx.increment("articles_fetched", articles.len() as u64);
    ctx.set_result("ingest_articles", &articles);
    ctx.set_result("ingest_articles_stats", &stats);
    Ok(())
}

async fn persist_patents(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    if ctx.is_dry_run {
        tracing::info!("dry run: skipping patent persistence");
        return Ok(());
    }
    let patents: Vec<Patent> = ctx.get_result("ingest_patents").unwrap_or_default();
    let report = services.persistence.upsert_patents(&patents).await.map_err(|e| e.to_string())?;
    ctx.increment("patents_persisted", report.count as u64);
    Ok(())
}

async fn persist_articles(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    if ctx.is_dry_run {
        tracing::info!("dry run: skipping article persistence");
        return Ok(());
    }
    let articles: Vec<Article> = ctx.get_result("ingest_articles").unwrap_or_default();
    let report = services.persistence.upsert_articles(&articles).await.map_err(|e| e.to_string())?;
    ctx.increment("articles_persisted", report.count as u64);
    Ok(())
}

async fn relevance_patents(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    let patents: Vec<Patent> = ctx.get_result("ingest_patents").unwrap_or_default();
    let classifier = Arc::clone(&services.classifier);
    let dlq = Arc::clone(&services.dlq);
    let concurrency = services.config.concurrency.p2_concurrency;

    let results = fanout::run_collect(
        patents,
        concurrency,
        move |patent: Patent| {
            let classifier = Arc::clone(&classifier);
            async move {
                classifier
                    .classify_patent_relevance(&patent)
                    .await
                    .map_err(|e| (patent.publication_number.clone(), e.to_string()))
            }
        },
        |item, (item_id, message): (String, String)| {
            ctx.add_error("relevance_patents", message.clone(), Some(item_id.clone()));
            dlq.write(
                "relevance_patents",
                &item_id,
                &message,
                serde_json::json!({"publication_number": item.publication_number}),
            );
        },
    )
    .await;

    ctx.increment("patents_relevance_classified", results.len() as u64);
    ctx.set_result("relevance_patents", &results);
    Ok(())
}

async fn relevance_articles(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    let articles: Vec<Article> = ctx.get_result("ingest_articles").unwrap_or_default();
    let classifier = Arc::clone(&services.classifier);
    let dlq = Arc::clone(&services.dlq);
    let concurrency = services.config.concurrency.p2_concurrency;

    let results = fanout::run_collect(
        articles,
        concurrency,
        move |article: Article| {
            let classifier = Arc::clone(&classifier);
            async move {
                classifier
                    .classify_article_relevance(&article)
                    .await
                    .map_err(|e| (article.id.to_string(), e.to_string()))
            }
        },
        |item, (item_id, message): (String, String)| {
            ctx.add_error("relevance_articles", message.clone(), Some(item_id.clone()));
            dlq.write("relevance_articles", &item_id, &message, serde_json::json!({"link": item.link}));
        },
    )
    .await;

    ctx.increment("articles_relevance_classified", results.len() as u64);
    ctx.set_result("relevance_articles", &results);
    Ok(())
}

async fn persist_relevance(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    if ctx.is_dry_run {
        tracing::info!("dry run: skipping relevance persistence");
        return Ok(());
    }
    let mut results: Vec<RelevanceResult> = ctx.get_result("relevance_patents").unwrap_or_default();
    results.extend(ctx.get_result::<Vec<RelevanceResult>>("relevance_articles").unwrap_or_default());

    let report = services
        .persistence
        .upsert_relevance_results(&results)
        .await
        .map_err(|e| e.to_string())?;
    ctx.increment("relevance_results_persisted", report.count as u64);
    Ok(())
}

fn relevant_category_by_id(results: &[RelevanceResult]) -> HashMap<String, Category> {
    results
        .iter()
        .filter(|r| r.is_relevant)
        .map(|r| (r.item_id.clone(), r.category))
        .collect()
}

async fn extraction_patents(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    let patents: Vec<Patent> = ctx.get_result("ingest_patents").unwrap_or_default();
    let relevance: Vec<RelevanceResult> = ctx.get_result("relevance_patents").unwrap_or_default();
    let category_by_id = relevant_category_by_id(&relevance);

    let items: Vec<(Patent, Category)> = patents
        .into_iter()
        .filter_map(|p| category_by_id.get(&p.publication_number).map(|c| (p, *c)))
        .collect();

    let classifier = Arc::clone(&services.classifier);
    let dlq = Arc::clone(&services.dlq);
    let concurrency = services.config.concurrency.p3_concurrency;

    let results = fanout::run_collect(
        items,
        concurrency,
        move |(patent, category): (Patent, Category)| {
            let classifier = Arc::clone(&classifier);
            async move {
                classifier
                    .classify_patent_extraction(&patent, category)
                    .await
                    .map_err(|e| (patent.publication_number.clone(), e.to_string()))
            }
        },
        |(item, _category), (item_id, message): (String, String)| {
            ctx.add_error("extraction_patents", message.clone(), Some(item_id.clone()));
            dlq.write(
                "extraction_patents",
                &item_id,
                &message,
                serde_json::json!({"publication_number": item.publication_number}),
            );
        },
    )
    .await;

    ctx.increment("patents_extracted", results.len() as u64);
    ctx.set_result("extraction_patents", &results);
    Ok(())
}

async fn extraction_articles(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    let articles: Vec<Article> = ctx.get_result("ingest_articles").unwrap_or_default();
    let relevance: Vec<RelevanceResult> = ctx.get_result("relevance_articles").unwrap_or_default();
    let category_by_id = relevant_category_by_id(&relevance);

    let items: Vec<(Article, Category)> = articles
        .into_iter()
        .filter_map(|a| category_by_id.get(&a.id.to_string()).map(|c| (a, *c)))
        .collect();

    let classifier = Arc::clone(&services.classifier);
    let dlq = Arc::clone(&services.dlq);
    let concurrency = services.config.concurrency.p3_concurrency;

    let results = fanout::run_collect(
        items,
        concurrency,
        move |(article, category): (Article, Category)| {
            let classifier = Arc::clone(&classifier);
            async move {
                classifier
                    .classify_article_extraction(&article, category)
                    .await
                    .map_err(|e| (article.id.to_string(), e.to_string()))
            }
        },
        |(item, _category), (item_id, message): (String, String)| {
            ctx.add_error("extraction_articles", message.clone(), Some(item_id.clone()));
            dlq.write("extraction_articles", &item_id, &message, serde_json::json!({"link": item.link}));
        },
    )
    .await;

    ctx.increment("articles_extracted", results.len() as u64);
    ctx.set_result("extraction_articles", &results);
    Ok(())
}

async fn persist_extraction(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    if ctx.is_dry_run {
        tracing::info!("dry run: skipping extraction persistence");
        return Ok(());
    }
    let mut results: Vec<ExtractionResult> = ctx.get_result("extraction_patents").unwrap_or_default();
    results.extend(ctx.get_result::<Vec<ExtractionResult>>("extraction_articles").unwrap_or_default());

    let report = services
        .persistence
        .upsert_extraction_results(&results)
        .await
        .map_err(|e| e.to_string())?;
    ctx.increment("extraction_results_persisted", report.count as u64);
    Ok(())
}

async fn resolve_entities(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    let patent_extractions: Vec<ExtractionResult> = ctx.get_result("extraction_patents").unwrap_or_default();
    let article_extractions: Vec<ExtractionResult> = ctx.get_result("extraction_articles").unwrap_or_default();

    let mut inputs: Vec<(String, String)> = Vec::new();
    for extraction in patent_extractions.iter().chain(article_extractions.iter()) {
        let source_tag = extraction.source_type.as_str().to_string();
        for name in &extraction.company_names {
            inputs.push((name.clone(), source_tag.clone()));
        }
    }

    let output = services.resolver.resolve(&inputs);
    ctx.increment("entities_resolved", output.entities.len() as u64);
    ctx.increment("alias_links_created", output.alias_links.len() as u64);
    ctx.set_result("resolved_entities", &output.entities);
    ctx.set_result("alias_links", &output.alias_links);
    Ok(())
}

async fn persist_entities(services: &PipelineServices, ctx: &RunContext) -> Result<(), String> {
    if ctx.is_dry_run {
        tracing::info!("dry run: skipping entity persistence");
        return Ok(());
    }
    let entities = ctx.get_result("resolved_entities").unwrap_or_default();
    let alias_links = ctx.get_result("alias_links").unwrap_or_default();

    let entities_report = services.persistence.upsert_entities(&entities).await.map_err(|e| e.to_string())?;
    let aliases_report = services.persistence.upsert_alias_links(&alias_links).await.map_err(|e| e.to_string())?;

    ctx.increment("entities_persisted", entities_report.count as u64);
    ctx.increment("alias_links_persisted", aliases_report.count as u64);
    Ok(())
}
