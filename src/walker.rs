//! Schema walker.
//!
//! Depth-first traversal of a schema and everything reachable from it,
//! collecting the fields marked for autopopulate. Nested sub-documents,
//! document arrays (including arrays of arrays of sub-documents) and
//! polymorphic variants of nested schemas are walked with the enclosing path
//! as prefix. Computed fields are reported after a schema's stored fields and
//! are never descended into.

use std::collections::HashSet;

use crate::directive::{Directive, PopulateDirective};
use crate::error::AutopopulateResult;
use crate::log_walker_debug;
use crate::schema::{FieldDescriptor, FieldKind, FieldOptions, SchemaId, SchemaRegistry};

/// Where a discovered reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    /// Static foreign model
    Model(String),
    /// Model name is read per document from this field
    Dynamic(String),
    /// Neither `ref` nor `refPath` was declared
    Unspecified,
}

/// A field found to be eligible for autopopulate.
#[derive(Debug, Clone)]
pub struct DiscoveredPath {
    pub path: String,
    pub target: ReferenceTarget,
    /// Raw configured setting
    pub autopopulate: Directive,
    /// Directive before any planning: `{ path, options: { maxDepth } }` plus
    /// the reference hint
    pub directive: PopulateDirective,
}

impl DiscoveredPath {
    fn new(path: String, options: &FieldOptions, directive: Directive, default_max_depth: u32) -> Self {
        let mut default = PopulateDirective::new(path.clone());
        default.options.max_depth = Some(default_max_depth);
        if let Some(model) = &options.reference {
            default.model = Some(model.clone());
            default.reference = Some(model.clone());
        }
        if let Some(selector) = &options.ref_path {
            default.ref_path = Some(selector.clone());
        }

        let target = match (&options.reference, &options.ref_path) {
            (Some(model), _) => ReferenceTarget::Model(model.clone()),
            (None, Some(selector)) => ReferenceTarget::Dynamic(selector.clone()),
            (None, None) => ReferenceTarget::Unspecified,
        };

        Self {
            path,
            target,
            autopopulate: directive,
            directive: default,
        }
    }
}

/// Discover every autopopulate path reachable from `root`.
///
/// Each call is an independent traversal: a schema is skipped only while it is
/// already on the current branch.
pub fn discover(
    registry: &SchemaRegistry,
    root: SchemaId,
    default_max_depth: u32,
) -> AutopopulateResult<Vec<DiscoveredPath>> {
    let mut walker = Walker {
        registry,
        default_max_depth,
        prefix: Vec::new(),
        on_stack: HashSet::new(),
        found: Vec::new(),
    };
    walker.walk(root)?;

    log_walker_debug!(
        "Discovered {} autopopulate path(s) in {}",
        walker.found.len(),
        registry.get(root)?.name
    );
    Ok(walker.found)
}

struct Walker<'a> {
    registry: &'a SchemaRegistry,
    default_max_depth: u32,
    prefix: Vec<String>,
    on_stack: HashSet<SchemaId>,
    found: Vec<DiscoveredPath>,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, id: SchemaId) -> AutopopulateResult<()> {
        if !self.on_stack.insert(id) {
            log_walker_debug!("Skipping {} at '{}': already on the traversal stack", id, self.joined());
            return Ok(());
        }

        let registry = self.registry;
        let schema = registry.get(id)?;
        for (name, field) in schema.fields() {
            self.prefix.push(name.to_string());
            let result = self.visit_field(field);
            self.prefix.pop();
            result?;
        }

        self.on_stack.remove(&id);

        for (name, options) in schema.computed_fields() {
            self.prefix.push(name.to_string());
            if let Some(directive) = options.truthy_directive() {
                self.record(options, directive.clone());
            }
            self.prefix.pop();
        }

        Ok(())
    }

    fn visit_field(&mut self, field: &FieldDescriptor) -> AutopopulateResult<()> {
        if let Some(sub) = field.sub_schema() {
            return self.walk_with_variants(sub);
        }

        if let FieldKind::Array(element) = &field.kind {
            if let FieldKind::Array(_) = element.kind {
                // Arrays of arrays only matter when they bottom out in sub-documents
                return match nested_document_array(element) {
                    Some(sub) => self.walk_with_variants(sub),
                    None => Ok(()),
                };
            }
        }

        if let Some(directive) = field.options.truthy_directive() {
            self.record(&field.options, directive.clone());
        } else if let FieldKind::Array(element) = &field.kind {
            if let Some(directive) = element.options.truthy_directive() {
                self.record(&element.options, directive.clone());
            }
        }
        Ok(())
    }

    fn walk_with_variants(&mut self, sub: SchemaId) -> AutopopulateResult<()> {
        self.walk(sub)?;
        let variants: Vec<SchemaId> = self.registry.get(sub)?.variants().map(|(_, id)| id).collect();
        for variant in variants {
            self.walk(variant)?;
        }
        Ok(())
    }

    fn record(&mut self, options: &FieldOptions, directive: Directive) {
        let path = self.joined();
        log_walker_debug!("Found autopopulate path '{}'", path);
        self.found
            .push(DiscoveredPath::new(path, options, directive, self.default_max_depth));
    }

    fn joined(&self) -> String {
        self.prefix.join(".")
    }
}

/// Unwrap plain array layers until a document array is reached
fn nested_document_array(mut field: &FieldDescriptor) -> Option<SchemaId> {
    loop {
        match &field.kind {
            FieldKind::Array(element) => {
                if let FieldKind::Embedded(id) = element.kind {
                    return Some(id);
                }
                field = element;
            }
            _ => return None,
        }
    }
}
