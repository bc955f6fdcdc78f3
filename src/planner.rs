//! Resolution planner and depth governor.
//!
//! Turns discovered paths into populate directives for one operation. The
//! operation's options decide whether anything happens at all (per-operation
//! opt-out, lightweight mode, depth ceiling); each path's configured setting
//! then decides what its directive looks like.

use crate::directive::{Directive, PopulateDirective};
use crate::error::AutopopulateResult;
use crate::operation::OperationContext;
use crate::walker::DiscoveredPath;
use crate::{log_planner_debug, log_planner_warn};

/// Filter over a path's default directive; `false` skips the path.
pub type PathFilter<'a> = &'a (dyn Fn(&PopulateDirective) -> bool + Send + Sync);

/// Depth state of an operation that is allowed to populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthGate {
    /// Recursion level of the operation itself
    pub depth: u32,
    /// Ceiling in force; zero means none at this level
    pub max_depth: u32,
}

impl DepthGate {
    /// Decide whether `ctx` may populate at all.
    ///
    /// Returns `None` for a lightweight read that did not opt back in, for an
    /// operation with `autopopulate: false`, and once the depth ceiling is
    /// reached.
    pub fn for_operation(ctx: &dyn OperationContext) -> Option<Self> {
        if let Some(lean) = ctx.lean() {
            if !lean.autopopulate {
                log_planner_debug!("Lightweight read without autopopulate opt-in, skipping");
                return None;
            }
        }

        let options = ctx.options();
        if options
            .autopopulate
            .as_ref()
            .map_or(false, |setting| setting.is_disabled())
        {
            log_planner_debug!("Autopopulate disabled for this operation");
            return None;
        }

        let mut max_depth = options.max_depth.unwrap_or(0);
        if let Some(requested) = options.autopopulate.as_ref().and_then(|s| s.max_depth()) {
            max_depth = requested;
        }
        let depth = options.depth.unwrap_or(0);

        if max_depth > 0 && depth >= max_depth {
            log_planner_debug!("Depth ceiling reached ({} >= {})", depth, max_depth);
            return None;
        }

        Some(Self { depth, max_depth })
    }

    /// Apply the nested depth options to a path's default directive
    fn descend(&self, mut directive: PopulateDirective) -> PopulateDirective {
        directive.options.depth = Some(self.depth + 1);
        if self.max_depth > 0 {
            directive.options.max_depth = Some(self.max_depth);
        }
        directive
    }
}

/// Plan the directives `ctx` should apply for `paths`.
///
/// Planning never mutates `paths`; planning the same inputs twice yields the
/// same directives.
pub fn plan(
    ctx: &dyn OperationContext,
    paths: &[DiscoveredPath],
    filter: Option<PathFilter<'_>>,
) -> AutopopulateResult<Vec<PopulateDirective>> {
    let gate = match DepthGate::for_operation(ctx) {
        Some(gate) => gate,
        None => return Ok(Vec::new()),
    };

    let mut planned = Vec::with_capacity(paths.len());
    for discovered in paths {
        if let Some(filter) = filter {
            if !filter(&discovered.directive) {
                log_planner_debug!("Filter skipped '{}'", discovered.path);
                continue;
            }
        }

        let built = gate.descend(discovered.directive.clone());
        if let Some(directive) = resolve_directive(ctx, &discovered.autopopulate, built)? {
            planned.push(directive);
        }
    }

    log_planner_debug!(
        "Planned {} of {} path(s) at depth {}",
        planned.len(),
        paths.len(),
        gate.depth
    );
    Ok(planned)
}

/// Resolve a configured setting against the options built for its path.
///
/// Callables are invoked with the operation and the built options, and their
/// result is resolved again. A static object that does not merge into a valid
/// directive yields no directive.
pub fn resolve_directive(
    ctx: &dyn OperationContext,
    value: &Directive,
    built: PopulateDirective,
) -> AutopopulateResult<Option<PopulateDirective>> {
    match value {
        Directive::Skip => Ok(None),
        Directive::Enabled => Ok(Some(built)),
        Directive::Options(overrides) => {
            let merged = built.merged_with(overrides);
            if merged.is_none() {
                log_planner_warn!(
                    "Ignoring malformed autopopulate options for '{}': {:?}",
                    built.path,
                    overrides
                );
            }
            Ok(merged)
        }
        Directive::Callable(f) => {
            let returned = f(ctx, &built)?;
            resolve_directive(ctx, &returned, built)
        }
    }
}
