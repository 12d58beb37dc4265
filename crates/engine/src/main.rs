use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;

use sentineldesk_engine::cache::ClassifierCache;
use sentineldesk_engine::classifier::Classifier;
use sentineldesk_engine::cli::Cli;
use sentineldesk_engine::config::load_config;
use sentineldesk_engine::context::RunContext;
use sentineldesk_engine::dlq::Dlq;
use sentineldesk_engine::oracle::OracleClient;
use sentineldesk_engine::persistence::PersistenceClient;
use sentineldesk_engine::pipeline::{build_dag, PipelineServices};
use sentineldesk_engine::resolver::EntityResolver;
use sentineldesk_sources::{FeedConfig, PatentSource, RssArticleSource, WarehousePatentSource};

/// Issues the single cheap read required before the DAG is allowed to
/// start (§6: "a `health_check` operation must issue a single cheap read
/// to validate connectivity before the DAG starts"). A failure here is a
/// `PreflightError`: fatal, with no DAG execution at all.
async fn services_preflight(persistence: &PersistenceClient) -> Result<(), sentineldesk_common::error::PipelineError> {
    persistence.health_check().await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&cli.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("sentineldesk pipeline starting");

    let mut system_config = match load_config(&cli.config_dir) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration, refusing to start");
            std::process::exit(1);
        }
    };
    cli.apply(&mut system_config);

    // Install Prometheus metrics recorder (ambient observability, not exposed
    // over HTTP here since this binary runs as a batch job rather than a
    // long-lived service; a caller can still render it from the handle).
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus metrics recorder");

    let patent_source: Arc<dyn PatentSource> = Arc::new(WarehousePatentSource::new(
        system_config.sources.warehouse_endpoint.clone(),
        system_config.sources.patent_countries.clone(),
        system_config.sources.min_patents,
    ));

    let feeds: Vec<FeedConfig> = system_config
        .sources
        .feeds
        .iter()
        .map(|f| FeedConfig { source_name: f.name.clone(), url: f.url.clone() })
        .collect();
    let article_source = Arc::new(RssArticleSource::new(
        feeds,
        system_config.sources.article_max_per_feed,
        system_config.sources.article_fetch_content,
    ));

    let oracle = if system_config.classifier.use_llm {
        match OracleClient::new(system_config.oracle.clone()) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "oracle client construction failed, falling back to heuristic classifier");
                None
            }
        }
    } else {
        None
    };

    let cache = ClassifierCache::new(Duration::from_secs(system_config.cache.ttl_seconds));
    let classifier = Arc::new(Classifier::new(system_config.classifier.clone(), oracle, cache));
    let resolver = Arc::new(EntityResolver::new(system_config.resolver.clone()));
    let dlq = Arc::new(Dlq::new(system_config.dlq.clone()));

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::error!("DATABASE_URL not set in environment, refusing to start");
            std::process::exit(1);
        }
    };

    let persistence = match PersistenceClient::connect(&database_url, 10, system_config.persistence.clone()).await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to persistence store");
            std::process::exit(1);
        }
    };

    if let Err(e) = services_preflight(&persistence).await {
        tracing::error!(error = %e, "preflight check failed, refusing to start the DAG");
        std::process::exit(1);
    }

    let services = Arc::new(PipelineServices {
        patent_source,
        article_source,
        classifier,
        resolver,
        persistence,
        dlq,
        config: system_config.clone(),
    });

    let mut dag = match build_dag(Arc::clone(&services)) {
        Ok(dag) => dag,
        Err(e) => {
            tracing::error!(error = %e, "failed to build pipeline DAG");
            std::process::exit(1);
        }
    };

    let ctx = RunContext::new(
        system_config.run.mode,
        system_config.run.start_date,
        system_config.run.end_date,
    )
    .with_time_budget(system_config.run.time_budget_minutes);

    let summary = match dag.execute(&ctx, false).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, "DAG execution failed to start");
            std::process::exit(1);
        }
    };

    tracing::info!(
        total_nodes = summary.total_nodes,
        completed = summary.completed,
        failed = summary.failed,
        skipped = summary.skipped,
        "{}",
        ctx.summary()
    );

    tracing::debug!(metrics = %metrics_handle.render(), "final metrics snapshot");

    if ctx.error_count() > 0 {
        std::process::exit(1);
    }
}
