//! # Autopopulate Error Handling
//!
//! Unified error type for schema discovery, directive planning and hook
//! execution. Resolver failures are carried through untouched so that the
//! caller of a read or write sees exactly what the resolver reported.

use thiserror::Error;

use crate::schema::SchemaId;

/// Boxed error raised by an external collaborator.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for autopopulate operations.
#[derive(Error, Debug)]
pub enum AutopopulateError {
    // ========== Schema Errors ==========
    /// A schema id did not resolve in the registry
    #[error("Schema not found: {id}")]
    SchemaNotFound { id: SchemaId },

    /// Schema definitions could not be turned into a registry
    #[error("Invalid schema definition: {0}")]
    InvalidSchema(String),

    // ========== Configuration Errors ==========
    /// Configuration validation failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hook restriction pattern failed to compile
    #[error("Invalid hook pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading configuration or definitions
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Logging system could not be initialized
    #[error("Logging error: {0}")]
    Logging(String),

    // ========== Runtime Errors ==========
    /// Raised by a callable directive while computing populate options
    #[error("Directive error: {0}")]
    Directive(String),

    /// Failure reported by the external resolver
    #[error(transparent)]
    Resolver(BoxedError),
}

impl AutopopulateError {
    /// Wrap a resolver failure without altering its message
    pub fn resolver<E>(err: E) -> Self
    where
        E: Into<BoxedError>,
    {
        Self::Resolver(err.into())
    }

    /// Create a configuration error with context
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a directive error with context
    pub fn directive<S: Into<String>>(msg: S) -> Self {
        Self::Directive(msg.into())
    }

    /// Create an invalid schema error with context
    pub fn invalid_schema<S: Into<String>>(msg: S) -> Self {
        Self::InvalidSchema(msg.into())
    }
}

/// Result type for autopopulate operations
pub type AutopopulateResult<T> = Result<T, AutopopulateError>;
