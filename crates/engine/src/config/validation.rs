use sentineldesk_common::config::{RunMode, SystemConfig};

use super::loader::ConfigError;

/// Validate the complete system configuration.
///
/// Checks sane ranges on numeric parameters and cross-validates run-mode
/// specific requirements. The engine refuses to start on validation
/// failure.
pub fn validate(config: &SystemConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_run(config, &mut errors);
    validate_concurrency(config, &mut errors);
    validate_oracle(config, &mut errors);
    validate_resolver(config, &mut errors);
    validate_persistence(config, &mut errors);
    validate_classifier(config, &mut errors);
    validate_sources(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.join("; ")))
    }
}

fn validate_run(config: &SystemConfig, errors: &mut Vec<String>) {
    let r = &config.run;

    if r.lookback_days < 0 {
        errors.push("run.lookback_days must be >= 0".into());
    }
    if r.time_budget_minutes == 0 {
        errors.push("run.time_budget_minutes must be > 0".into());
    }

    match r.mode {
        RunMode::Backfill => {
            if r.start_date.is_none() || r.end_date.is_none() {
                errors.push("run.mode=backfill requires both start_date and end_date".into());
            } else if let (Some(start), Some(end)) = (r.start_date, r.end_date) {
                if start > end {
                    errors.push("run.start_date must be <= run.end_date".into());
                }
            }
        }
        RunMode::Incremental | RunMode::DryRun => {
            if r.start_date.is_some() != r.end_date.is_some() {
                errors.push(
                    "run.start_date and run.end_date must both be set or both be omitted".into(),
                );
            }
        }
    }
}

fn validate_concurrency(config: &SystemConfig, errors: &mut Vec<String>) {
    let c = &config.concurrency;

    if c.p2_concurrency == 0 {
        errors.push("concurrency.p2_concurrency must be > 0".into());
    }
    if c.p3_concurrency == 0 {
        errors.push("concurrency.p3_concurrency must be > 0".into());
    }
}

fn validate_oracle(config: &SystemConfig, errors: &mut Vec<String>) {
    let o = &config.oracle;

    if o.provider.is_empty() {
        errors.push("oracle.provider must not be empty".into());
    }
    if o.model.is_empty() {
        errors.push("oracle.model must not be empty".into());
    }
    if o.max_rpm == 0 {
        errors.push("oracle.max_rpm must be > 0".into());
    }
    if o.max_retries == 0 {
        errors.push("oracle.max_retries must be > 0".into());
    }
    if o.max_prompt_chars == 0 {
        errors.push("oracle.max_prompt_chars must be > 0".into());
    }
    if o.api_key_env.is_empty() {
        errors.push("oracle.api_key_env must not be empty".into());
    }
    if config.classifier.use_llm && std::env::var(&o.api_key_env).is_err() {
        errors.push(format!(
            "classifier.use_llm is true but {} is not set in the environment",
            o.api_key_env
        ));
    }
}

fn validate_resolver(config: &SystemConfig, errors: &mut Vec<String>) {
    let r = &config.resolver;

    if !(0.0..=1.0).contains(&r.hard_match_threshold) {
        errors.push("resolver.hard_match_threshold must be between 0.0 and 1.0".into());
    }
    if !(0.0..=1.0).contains(&r.soft_match_threshold) {
        errors.push("resolver.soft_match_threshold must be between 0.0 and 1.0".into());
    }
    if r.soft_match_threshold > r.hard_match_threshold {
        errors.push("resolver.soft_match_threshold must be <= hard_match_threshold".into());
    }

    let weight_sum =
        r.weight_jaccard + r.weight_edit + r.weight_jaro_winkler + r.weight_acronym;
    if (weight_sum - 1.0).abs() > 0.01 {
        errors.push(format!(
            "resolver similarity weights must sum to ~1.0, got {weight_sum:.3}"
        ));
    }
    if r.min_block_size == 0 {
        errors.push("resolver.min_block_size must be > 0".into());
    }
    if r.max_block_size < r.min_block_size {
        errors.push("resolver.max_block_size must be >= min_block_size".into());
    }
    if r.max_cluster_size == 0 {
        errors.push("resolver.max_cluster_size must be > 0".into());
    }
}

fn validate_persistence(config: &SystemConfig, errors: &mut Vec<String>) {
    let p = &config.persistence;

    if p.batch_size == 0 {
        errors.push("persistence.batch_size must be > 0".into());
    }
    if p.max_batch_size < p.batch_size {
        errors.push("persistence.max_batch_size must be >= batch_size".into());
    }
    if p.max_retries == 0 {
        errors.push("persistence.max_retries must be > 0".into());
    }
}

fn validate_sources(config: &SystemConfig, errors: &mut Vec<String>) {
    let s = &config.sources;

    if s.warehouse_endpoint.is_empty() {
        errors.push("sources.warehouse_endpoint must not be empty".into());
    }
    if s.patent_countries.is_empty() {
        errors.push("sources.patent_countries must not be empty".into());
    }
    if s.feeds.is_empty() {
        errors.push("sources.feeds must not be empty".into());
    }
    if s.article_max_per_feed == 0 {
        errors.push("sources.article_max_per_feed must be > 0".into());
    }
}

fn validate_classifier(config: &SystemConfig, errors: &mut Vec<String>) {
    let c = &config.classifier;

    if !(0.0..=1.0).contains(&c.relevance_threshold) {
        errors.push("classifier.relevance_threshold must be between 0.0 and 1.0".into());
    }
    if c.relevance_context_chars == 0 {
        errors.push("classifier.relevance_context_chars must be > 0".into());
    }
    if c.extraction_context_chars == 0 {
        errors.push("classifier.extraction_context_chars must be > 0".into());
    }
    if !c.use_llm && !c.fallback_enabled {
        errors.push(
            "classifier.use_llm is false but fallback_enabled is also false — no classifier path is available".into(),
        );
    }
}
