//! # Logging System
//!
//! The crate logs through the `log` facade under per-feature targets (see
//! [`features`]). Binaries and tests that want output call
//! [`LoggingSystem::init`], which installs an `env_logger` configured from a
//! [`LogConfig`]. `RUST_LOG` still overrides the configured levels.

pub mod config;
pub mod features;

pub use config::LogConfig;
pub use features::LogFeature;

use once_cell::sync::OnceCell;

use crate::error::{AutopopulateError, AutopopulateResult};

/// Configuration the logger was installed with
static LOGGING_CONFIG: OnceCell<LogConfig> = OnceCell::new();

pub struct LoggingSystem;

impl LoggingSystem {
    /// Initialize the logger with a custom configuration
    pub fn init(config: &LogConfig) -> AutopopulateResult<()> {
        config.validate()?;

        LOGGING_CONFIG
            .set(config.clone())
            .map_err(|_| AutopopulateError::Logging("Logging system already initialized".to_string()))?;

        let mut builder = env_logger::Builder::new();
        if let Some(level) = config::parse_level(&config.default_level) {
            builder.filter_level(level);
        }
        for (target, level) in config.feature_filters() {
            builder.filter_module(target, level);
        }
        builder.parse_env("RUST_LOG");

        builder
            .try_init()
            .map_err(|e| AutopopulateError::Logging(e.to_string()))
    }
}
