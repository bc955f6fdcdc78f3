//! Feature-specific logging macros and utilities
//!
//! Each component logs under its own target so that walker output can be
//! enabled without planner noise and vice versa.

/// Feature categories for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFeature {
    Walker,
    Planner,
    Variants,
    Hooks,
}

impl LogFeature {
    pub const ALL: [LogFeature; 4] = [
        LogFeature::Walker,
        LogFeature::Planner,
        LogFeature::Variants,
        LogFeature::Hooks,
    ];

    /// Get the target string for this feature
    pub fn target(&self) -> &'static str {
        match self {
            LogFeature::Walker => "fold_autopopulate::walker",
            LogFeature::Planner => "fold_autopopulate::planner",
            LogFeature::Variants => "fold_autopopulate::variants",
            LogFeature::Hooks => "fold_autopopulate::hooks",
        }
    }

    /// Feature name as used in configuration files
    pub fn name(&self) -> &'static str {
        match self {
            LogFeature::Walker => "walker",
            LogFeature::Planner => "planner",
            LogFeature::Variants => "variants",
            LogFeature::Hooks => "hooks",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|feature| feature.name() == name)
    }
}

// Walker logging macros
#[macro_export]
macro_rules! log_walker_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "fold_autopopulate::walker", $($arg)*)
    };
}

// Planner logging macros
#[macro_export]
macro_rules! log_planner_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "fold_autopopulate::planner", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_planner_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "fold_autopopulate::planner", $($arg)*)
    };
}

// Variant pass logging macros
#[macro_export]
macro_rules! log_variants_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "fold_autopopulate::variants", $($arg)*)
    };
}

// Hook installation logging macros
#[macro_export]
macro_rules! log_hooks_info {
    ($($arg:tt)*) => {
        log::info!(target: "fold_autopopulate::hooks", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_hooks_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "fold_autopopulate::hooks", $($arg)*)
    };
}
