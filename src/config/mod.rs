//! Installer-time configuration for the autopopulate plugin
//!
//! Loaded from TOML, with environment variable overrides applied on top:
//!
//! ```toml
//! functions = ["find", "findOne", "save"]   # or: functions = { pattern = "^find" }
//! default_max_depth = 10
//!
//! [logging]
//! default_level = "INFO"
//! features = { planner = "DEBUG" }
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::directive::DEFAULT_MAX_DEPTH;
use crate::error::{AutopopulateError, AutopopulateResult};
use crate::hooks::{HookName, HookSelector};
use crate::logging::LogConfig;

/// Restriction on which lifecycle hooks are instrumented
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionFilter {
    /// Exact hook names
    List(Vec<String>),
    /// Regular expression matched against hook names
    Pattern { pattern: String },
}

/// Plugin configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutopopulateConfig {
    /// Hooks to instrument; all hooks when absent
    #[serde(default)]
    pub functions: Option<FunctionFilter>,
    /// Ceiling written into every discovered path's default directive
    #[serde(default = "default_max_depth")]
    pub default_max_depth: u32,
    #[serde(default)]
    pub logging: LogConfig,
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

impl Default for AutopopulateConfig {
    fn default() -> Self {
        Self {
            functions: None,
            default_max_depth: DEFAULT_MAX_DEPTH,
            logging: LogConfig::default(),
        }
    }
}

impl AutopopulateConfig {
    /// Restrict instrumentation to the named hooks
    pub fn with_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions = Some(FunctionFilter::List(names.into_iter().map(Into::into).collect()));
        self
    }

    /// Restrict instrumentation to hooks matching `pattern`
    pub fn with_function_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.functions = Some(FunctionFilter::Pattern {
            pattern: pattern.into(),
        });
        self
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> AutopopulateResult<Self> {
        let config: AutopopulateConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file and apply environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> AutopopulateResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: AutopopulateConfig = toml::from_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `AUTOPOPULATE_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> AutopopulateResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> AutopopulateResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("AUTOPOPULATE_LOG_LEVEL") {
            self.logging.default_level = level;
        }
        if let Some(depth) = lookup("AUTOPOPULATE_MAX_DEPTH") {
            self.default_max_depth = depth.parse().map_err(|_| {
                AutopopulateError::config(format!("AUTOPOPULATE_MAX_DEPTH is not a number: {}", depth))
            })?;
        }
        if let Some(functions) = lookup("AUTOPOPULATE_FUNCTIONS") {
            self.functions = Some(FunctionFilter::List(
                functions
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect(),
            ));
        }
        Ok(())
    }

    /// Validate hook names, the hook pattern and logging settings
    pub fn validate(&self) -> AutopopulateResult<()> {
        if let Some(FunctionFilter::List(names)) = &self.functions {
            let known: Vec<&str> = HookName::READS
                .iter()
                .chain(std::iter::once(&HookName::Save))
                .map(HookName::as_str)
                .collect();
            if let Some(unknown) = names.iter().find(|name| !known.contains(&name.as_str())) {
                return Err(AutopopulateError::config(format!("Unknown hook name: {}", unknown)));
            }
        }
        self.hook_selector()?;
        self.logging.validate()
    }

    /// Compile the hook restriction
    pub fn hook_selector(&self) -> AutopopulateResult<HookSelector> {
        Ok(match &self.functions {
            None => HookSelector::All,
            Some(FunctionFilter::List(names)) => HookSelector::names(names.iter().cloned()),
            Some(FunctionFilter::Pattern { pattern }) => HookSelector::Pattern(Regex::new(pattern)?),
        })
    }
}
