//! Populate directives and the option types threaded through them.
//!
//! A field's `autopopulate` setting is a [`Directive`]. Planning turns it into a
//! [`PopulateDirective`], the object handed to the resolver. Its nested
//! [`QueryOptions`] become the options of the resolver's nested read, which is
//! how `_depth` and `maxDepth` travel down a chain of recursive populates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::AutopopulateResult;
use crate::operation::OperationContext;

/// Default recursion ceiling applied to every discovered path.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Callable directive. Invoked once per planning pass with the operation and
/// the options built so far; its return value is resolved again.
pub type DirectiveFn = Arc<
    dyn Fn(&dyn OperationContext, &PopulateDirective) -> AutopopulateResult<Directive>
        + Send
        + Sync,
>;

/// Per-field autopopulate setting.
#[derive(Clone)]
pub enum Directive {
    /// Explicitly off (`false` / `null`)
    Skip,
    /// Populate with the default options (`true`)
    Enabled,
    /// Static populate options merged over the defaults
    Options(Map<String, Value>),
    /// Options computed per operation
    Callable(DirectiveFn),
}

impl Directive {
    /// Wrap a closure as a callable directive
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&dyn OperationContext, &PopulateDirective) -> AutopopulateResult<Directive>
            + Send
            + Sync
            + 'static,
    {
        Self::Callable(Arc::new(f))
    }

    /// Build a static options directive from a JSON object.
    ///
    /// Booleans and `null` map onto [`Directive::Enabled`] and
    /// [`Directive::Skip`]; any other non-object value is treated as off.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Bool(true) => Self::Enabled,
            Value::Object(map) => Self::Options(map),
            _ => Self::Skip,
        }
    }

    /// Whether this setting asks for population at all
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Skip)
    }
}

impl From<bool> for Directive {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Skip
        }
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "Skip"),
            Self::Enabled => write!(f, "Enabled"),
            Self::Options(map) => f.debug_tuple("Options").field(map).finish(),
            Self::Callable(_) => write!(f, "Callable(<fn>)"),
        }
    }
}

/// Per-operation `autopopulate` option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AutopopulateSetting {
    /// `autopopulate: true | false`
    Toggle(bool),
    /// `autopopulate: { maxDepth: n }`
    Settings {
        #[serde(rename = "maxDepth", default, skip_serializing_if = "Option::is_none")]
        max_depth: Option<u32>,
    },
}

impl AutopopulateSetting {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Toggle(false))
    }

    /// Ceiling requested through the setting, ignoring zero
    pub fn max_depth(&self) -> Option<u32> {
        match self {
            Self::Settings {
                max_depth: Some(depth),
            } if *depth > 0 => Some(*depth),
            _ => None,
        }
    }
}

/// Options of a read or write operation.
///
/// Also used as the nested `options` of a [`PopulateDirective`]: the resolver
/// runs its nested read with exactly these options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Recursion level of the operation; absent means top level
    #[serde(rename = "_depth", default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,

    /// Recursion ceiling; zero or absent disables the check at this level
    #[serde(rename = "maxDepth", default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autopopulate: Option<AutopopulateSetting>,

    /// Any other option understood by the host
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryOptions {
    /// Options with autopopulate switched off for this one operation
    pub fn disabled() -> Self {
        Self {
            autopopulate: Some(AutopopulateSetting::Toggle(false)),
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}

/// Lightweight (non-hydrated) read marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeanOptions {
    /// Re-enables autopopulate for a lightweight read
    #[serde(default)]
    pub autopopulate: bool,
}

/// Fully merged directive handed to the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulateDirective {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "refPath", default, skip_serializing_if = "Option::is_none")]
    pub ref_path: Option<String>,

    #[serde(default)]
    pub options: QueryOptions,

    /// `select`, `match`, `populate` and anything else the resolver accepts
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PopulateDirective {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            model: None,
            reference: None,
            ref_path: None,
            options: QueryOptions::default(),
            extra: Map::new(),
        }
    }

    /// Field selection requested for the populated entities
    pub fn select(&self) -> Option<&str> {
        self.extra.get("select").and_then(Value::as_str)
    }

    /// Extra filter applied to the populated entities
    pub fn match_filter(&self) -> Option<&Map<String, Value>> {
        self.extra.get("match").and_then(Value::as_object)
    }

    /// Shallow-merge `overrides` over this directive.
    ///
    /// A top-level `maxDepth` key is moved into `options.maxDepth` instead of
    /// becoming a directive field. An `options` key replaces the nested
    /// options wholesale. Returns `None` when the merged object is not a valid
    /// directive.
    pub fn merged_with(&self, overrides: &Map<String, Value>) -> Option<Self> {
        let mut base = self.clone();
        let mut overrides = overrides.clone();

        if let Some(max_depth) = overrides.remove("maxDepth") {
            if !max_depth.is_null() {
                let depth = max_depth.as_u64().and_then(|d| u32::try_from(d).ok())?;
                base.options.max_depth = Some(depth);
            }
        }

        let mut merged = match serde_json::to_value(&base) {
            Ok(Value::Object(map)) => map,
            _ => return None,
        };
        for (key, value) in overrides {
            merged.insert(key, value);
        }

        serde_json::from_value(Value::Object(merged)).ok()
    }
}
