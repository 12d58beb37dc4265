use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

use sentineldesk_common::config::{RunMode, SystemConfig};

/// Batch runner for a single pipeline invocation. Every flag also reads
/// from its matching environment variable (`clap`'s `env` attribute), so
/// the binary works unattended under a scheduler with no CLI at all.
#[derive(Parser, Debug)]
#[command(name = "sentineldesk", about = "Threat-intel signal pipeline batch runner")]
pub struct Cli {
    #[arg(long, value_enum, env = "RUN_MODE", default_value = "incremental")]
    pub mode: CliRunMode,

    #[arg(long, env = "LOOKBACK_DAYS")]
    pub lookback: Option<i64>,

    #[arg(long, env = "START_DATE")]
    pub start: Option<NaiveDate>,

    #[arg(long, env = "END_DATE")]
    pub end: Option<NaiveDate>,

    #[arg(long = "p2-concurrency", env = "P2_CONCURRENCY")]
    pub p2_concurrency: Option<usize>,

    #[arg(long = "p3-concurrency", env = "P3_CONCURRENCY")]
    pub p3_concurrency: Option<usize>,

    #[arg(long = "log-level", env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long = "config-dir", env = "CONFIG_DIR", default_value = "config")]
    pub config_dir: std::path::PathBuf,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum CliRunMode {
    Incremental,
    Backfill,
    DryRun,
}

impl From<CliRunMode> for RunMode {
    fn from(mode: CliRunMode) -> Self {
        match mode {
            CliRunMode::Incremental => RunMode::Incremental,
            CliRunMode::Backfill => RunMode::Backfill,
            CliRunMode::DryRun => RunMode::DryRun,
        }
    }
}

impl Cli {
    /// Layers CLI/env overrides onto a loaded `system.toml`. CLI flags
    /// (and their `env` fallbacks) win over the file; unset optional
    /// flags leave the file's value untouched.
    pub fn apply(&self, config: &mut SystemConfig) {
        config.run.mode = self.mode.into();
        if let Some(lookback) = self.lookback {
            config.run.lookback_days = lookback;
        }
        if self.start.is_some() {
            config.run.start_date = self.start;
        }
        if self.end.is_some() {
            config.run.end_date = self.end;
        }
        if let Some(p2) = self.p2_concurrency {
            config.concurrency.p2_concurrency = p2;
        }
        if let Some(p3) = self.p3_concurrency {
            config.concurrency.p3_concurrency = p3;
        }
    }
}
