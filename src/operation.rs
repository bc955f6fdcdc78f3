//! Collaborator interfaces for the in-flight operation.
//!
//! The host implements these for its query and document types. Every planner
//! and directive function receives the operation explicitly through
//! [`OperationContext`].

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::directive::{LeanOptions, PopulateDirective, QueryOptions};
use crate::error::AutopopulateResult;
use crate::schema::SchemaId;

/// Read-only view of an operation used while planning.
pub trait OperationContext: Send + Sync {
    /// Options the operation was issued with
    fn options(&self) -> QueryOptions;

    /// Lightweight-mode settings, when the operation returns plain data
    fn lean(&self) -> Option<LeanOptions> {
        None
    }

    fn is_lightweight(&self) -> bool {
        self.lean().is_some()
    }
}

/// A pending read (`find`, `findOne`, `findOneAnd*`).
#[async_trait]
pub trait QueryOperation: OperationContext {
    /// Apply one directive to the read's eventual result
    async fn resolve(&self, directive: PopulateDirective) -> AutopopulateResult<()>;
}

/// What a document reports about a previously populated path.
#[derive(Debug, Clone, PartialEq)]
pub enum Populated {
    /// The path holds raw references
    No,
    /// A single reference was populated; holds its id
    Single(Value),
    /// A list of references was populated; `None` marks a missing entity
    Many(Vec<Option<Value>>),
}

impl Populated {
    pub fn is_populated(&self) -> bool {
        !matches!(self, Self::No)
    }
}

/// A document that has just been written.
#[async_trait]
pub trait DocumentOperation: OperationContext {
    /// Embedded sub-documents are skipped; only top-level documents repopulate
    fn is_subdocument(&self) -> bool;

    fn populated(&self, path: &str) -> Populated;

    /// Current (possibly partially populated) value at `path`
    fn current_value(&self, path: &str) -> Option<Value>;

    /// Apply all directives in a single resolver call
    async fn resolve_all(&self, directives: Vec<PopulateDirective>) -> AutopopulateResult<()>;
}

/// A document returned by a read, possibly hydrated as a polymorphic variant.
pub trait VariantDocument: Send + Sync + Sized {
    /// Model of a non-base variant; `None` for documents of the base model
    fn variant_model(&self) -> Option<Arc<dyn ModelHandle<Self>>>;

    fn populated(&self, path: &str) -> Populated;
}

/// Handle onto a model, used for batched population of its documents.
#[async_trait]
pub trait ModelHandle<D: Sync>: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> SchemaId;

    async fn resolve_many(
        &self,
        docs: &[&D],
        directives: Vec<PopulateDirective>,
    ) -> AutopopulateResult<()>;
}
