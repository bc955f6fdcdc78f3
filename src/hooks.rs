//! Lifecycle hook points and the registration seam onto the host scheduler.

use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::AutopopulateResult;
use crate::plugin::Autopopulate;
use crate::schema::SchemaId;

/// Host operations the plugin can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    Find,
    FindOne,
    FindOneAndUpdate,
    FindOneAndDelete,
    FindOneAndReplace,
    Save,
}

impl HookName {
    /// Read hooks, in registration order
    pub const READS: [HookName; 5] = [
        HookName::Find,
        HookName::FindOne,
        HookName::FindOneAndUpdate,
        HookName::FindOneAndDelete,
        HookName::FindOneAndReplace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookName::Find => "find",
            HookName::FindOne => "findOne",
            HookName::FindOneAndUpdate => "findOneAndUpdate",
            HookName::FindOneAndDelete => "findOneAndDelete",
            HookName::FindOneAndReplace => "findOneAndReplace",
            HookName::Save => "save",
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookTiming {
    Pre,
    Post,
}

/// A single place in the lifecycle where the plugin runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookPoint {
    pub timing: HookTiming,
    pub name: HookName,
}

impl HookPoint {
    pub const fn pre(name: HookName) -> Self {
        Self {
            timing: HookTiming::Pre,
            name,
        }
    }

    pub const fn post(name: HookName) -> Self {
        Self {
            timing: HookTiming::Post,
            name,
        }
    }
}

/// Host scheduler the plugin registers itself into.
///
/// For a registered point the host calls back into the plugin:
/// pre read points → [`Autopopulate::before_query`], post read points →
/// [`Autopopulate::after_query`], post `save` → [`Autopopulate::after_save`].
pub trait HookRegistry {
    fn register(
        &self,
        schema: SchemaId,
        point: HookPoint,
        plugin: Arc<Autopopulate>,
    ) -> AutopopulateResult<()>;
}

/// Restricts which hooks are instrumented.
#[derive(Debug, Clone, Default)]
pub enum HookSelector {
    #[default]
    All,
    Names(HashSet<String>),
    Pattern(Regex),
}

impl HookSelector {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, hook: HookName) -> bool {
        match self {
            HookSelector::All => true,
            HookSelector::Names(names) => names.contains(hook.as_str()),
            HookSelector::Pattern(pattern) => pattern.is_match(hook.as_str()),
        }
    }

    /// Every hook point to register, in order
    pub fn hook_points(&self) -> Vec<HookPoint> {
        let mut points = Vec::new();
        for name in HookName::READS {
            if self.allows(name) {
                points.push(HookPoint::pre(name));
                points.push(HookPoint::post(name));
            }
        }
        if self.allows(HookName::Save) {
            points.push(HookPoint::post(HookName::Save));
        }
        points
    }
}
