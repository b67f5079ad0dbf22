//! Error types for sqlport

use thiserror::Error;

use crate::DialectId;

/// Core error type for sqlport operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// The connection itself failed (broken socket, closed handle)
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single statement failed while the connection stayed usable
    #[error("Query error: {0}")]
    Query(String),

    #[error("{operation} is not supported by {dialect}")]
    UnsupportedOperation {
        dialect: DialectId,
        operation: String,
    },

    #[error("Invalid identifier {identifier:?}: {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to introspect {object}: {source}")]
    Introspection {
        object: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn unsupported(dialect: DialectId, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            dialect,
            operation: operation.into(),
        }
    }

    pub fn invalid_identifier(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    pub fn introspection(object: impl Into<String>, source: CoreError) -> Self {
        Self::Introspection {
            object: object.into(),
            source: Box::new(source),
        }
    }

    /// Whether the connection is unusable, as opposed to a single statement failing.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Introspection { source, .. } => source.is_connection_error(),
            _ => false,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }
}

/// Result type alias for sqlport operations
pub type Result<T> = std::result::Result<T, CoreError>;
