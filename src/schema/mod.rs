//! Schema arena introspected by the walker.

pub mod json_schema;
pub mod registry;
pub mod types;

pub use json_schema::{JsonSchemaDefinition, JsonSchemaDefinitions};
pub use registry::SchemaRegistry;
pub use types::{FieldDescriptor, FieldKind, FieldOptions, ScalarType, Schema, SchemaId};
