//! Configuration for the logging system
//!
//! Loaded as the `[logging]` table of the autopopulate configuration file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::features::LogFeature;
use crate::error::{AutopopulateError, AutopopulateResult};

/// Main logging configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default log level for all modules
    #[serde(default = "default_level")]
    pub default_level: String,
    /// Feature-specific log levels, keyed by feature name
    #[serde(default)]
    pub features: HashMap<String, String>,
}

fn default_level() -> String {
    "INFO".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: default_level(),
            features: HashMap::new(),
        }
    }
}

/// Parse a level name as written in configuration files
pub fn parse_level(level: &str) -> Option<log::LevelFilter> {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => Some(log::LevelFilter::Trace),
        "DEBUG" => Some(log::LevelFilter::Debug),
        "INFO" => Some(log::LevelFilter::Info),
        "WARN" => Some(log::LevelFilter::Warn),
        "ERROR" => Some(log::LevelFilter::Error),
        "OFF" => Some(log::LevelFilter::Off),
        _ => None,
    }
}

impl LogConfig {
    /// Check level names and feature names
    pub fn validate(&self) -> AutopopulateResult<()> {
        if parse_level(&self.default_level).is_none() {
            return Err(AutopopulateError::config(format!(
                "Invalid log level: {}",
                self.default_level
            )));
        }
        for (feature, level) in &self.features {
            if LogFeature::from_name(feature).is_none() {
                return Err(AutopopulateError::config(format!(
                    "Unknown logging feature: {}",
                    feature
                )));
            }
            if parse_level(level).is_none() {
                return Err(AutopopulateError::config(format!(
                    "Invalid log level for {}: {}",
                    feature, level
                )));
            }
        }
        Ok(())
    }

    /// Level filters per feature target
    pub fn feature_filters(&self) -> Vec<(&'static str, log::LevelFilter)> {
        self.features
            .iter()
            .filter_map(|(feature, level)| {
                Some((LogFeature::from_name(feature)?.target(), parse_level(level)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(LogConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_features_and_levels() {
        let mut config = LogConfig::default();
        config.features.insert("network".to_string(), "DEBUG".to_string());
        assert!(config.validate().is_err());

        let mut config = LogConfig::default();
        config.features.insert("walker".to_string(), "LOUD".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn maps_features_to_targets() {
        let mut config = LogConfig::default();
        config.features.insert("planner".to_string(), "debug".to_string());
        assert_eq!(
            config.feature_filters(),
            vec![("fold_autopopulate::planner", log::LevelFilter::Debug)]
        );
    }
}
