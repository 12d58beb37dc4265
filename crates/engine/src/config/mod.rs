pub mod loader;
pub mod validation;

pub use loader::{load_config, ConfigError};
