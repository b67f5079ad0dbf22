//! Dump error type

use sqlport_core::{CoreError, DialectId};
use thiserror::Error;

/// Errors during a dump.
///
/// Every variant except [`DumpError::SinkWrite`] and
/// [`DumpError::Configuration`] is attributed to a single object and recorded
/// in the report while the dump continues.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("{operation} is not supported by {dialect}")]
    UnsupportedOperation {
        dialect: DialectId,
        operation: String,
    },

    #[error("Invalid identifier {identifier:?}: {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    #[error("Failed to introspect {object}: {source}")]
    Introspection {
        object: String,
        #[source]
        source: CoreError,
    },

    #[error("Failed to read rows of {table}: {source}")]
    DataRead {
        table: String,
        #[source]
        source: CoreError,
    },

    #[error("Failed to write dump output: {0}")]
    SinkWrite(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DumpError {
    /// Attribute a core error to `object`, keeping rendering failures distinct
    pub fn from_core(object: &str, error: CoreError) -> Self {
        match error {
            CoreError::UnsupportedOperation { dialect, operation } => {
                Self::UnsupportedOperation { dialect, operation }
            }
            CoreError::InvalidIdentifier { identifier, reason } => {
                Self::InvalidIdentifier { identifier, reason }
            }
            CoreError::Introspection { object, source } => Self::Introspection {
                object,
                source: *source,
            },
            CoreError::Configuration(message) => Self::Configuration(message),
            other => Self::Introspection {
                object: object.to_string(),
                source: other,
            },
        }
    }

    /// Whether the whole dump must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SinkWrite(_) | Self::Configuration(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }
}
