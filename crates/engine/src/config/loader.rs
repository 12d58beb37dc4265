use std::path::{Path, PathBuf};

use sentineldesk_common::config::SystemConfig;

use super::validation;

/// Load `system.toml` from the given config directory, validate it, and
/// return the parsed tree. Fails loudly — the binary refuses to start on
/// a validation error rather than limping along on defaults.
pub fn load_config(config_dir: &Path) -> Result<SystemConfig, ConfigError> {
    tracing::info!(config_dir = %config_dir.display(), "Loading configuration");

    let system_path = config_dir.join("system.toml");
    let system = load_system_config(&system_path)?;

    validation::validate(&system)?;

    tracing::info!("Configuration loaded successfully");
    Ok(system)
}

fn load_system_config(path: &Path) -> Result<SystemConfig, ConfigError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "system.toml not found, using defaults");
        return Ok(SystemConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<ConfigError> for sentineldesk_common::PipelineError {
    fn from(e: ConfigError) -> Self {
        sentineldesk_common::PipelineError::Config(e.to_string())
    }
}
