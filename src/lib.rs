//! # Fold Autopopulate
//!
//! Schema-driven automatic population of references for document-model reads
//! and writes. Fields tagged with an autopopulate directive are discovered once
//! per schema; every read, and every write that leaves references unresolved,
//! then has those references populated without the caller asking for it.
//!
//! ## Core Components
//!
//! * `schema` - Schema arena, field descriptors and JSON schema definitions
//! * `walker` - Discovery of autopopulate paths through a schema graph
//! * `planner` - Per-operation directive planning and recursion depth control
//! * `variants` - Post-read population of polymorphic variant documents
//! * `plugin` - Installation onto a schema and the hook entry points
//! * `hooks` - Lifecycle hook points and the registration seam
//! * `operation` - Interfaces the host implements for queries and documents
//! * `config` - Plugin configuration (TOML and environment)
//! * `logging` - Feature-targeted logging
//! * `mock` - In-memory model layer (feature `mock`)
//!
//! ## Architecture
//!
//! The host owns the database and the populate resolver. It registers the
//! plugin on a schema through [`HookRegistry`]; the plugin answers each hook by
//! planning [`PopulateDirective`]s and handing them back to the host's
//! [`QueryOperation`], [`DocumentOperation`] or [`ModelHandle`]. Nested reads
//! issued by the resolver carry the depth options the planner attached, which
//! is how recursion through self-referencing schemas terminates.

pub mod config;
pub mod directive;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod operation;
pub mod planner;
pub mod plugin;
pub mod schema;
pub mod variants;
pub mod walker;

#[cfg(feature = "mock")]
pub mod mock;

// Re-export main types for convenience
pub use config::{AutopopulateConfig, FunctionFilter};
pub use directive::{
    AutopopulateSetting, Directive, LeanOptions, PopulateDirective, QueryOptions, DEFAULT_MAX_DEPTH,
};
pub use error::{AutopopulateError, AutopopulateResult};
pub use hooks::{HookName, HookPoint, HookRegistry, HookSelector, HookTiming};
pub use logging::LoggingSystem;
pub use operation::{
    DocumentOperation, ModelHandle, OperationContext, Populated, QueryOperation, VariantDocument,
};
pub use planner::{plan, DepthGate};
pub use plugin::{Autopopulate, DiscoveryCache};
pub use schema::{FieldDescriptor, FieldKind, FieldOptions, Schema, SchemaId, SchemaRegistry};
pub use walker::{discover, DiscoveredPath, ReferenceTarget};
