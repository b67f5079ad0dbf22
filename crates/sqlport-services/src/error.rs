use sqlport_core::CoreError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level errors with user-friendly messages
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No SQL dialect for driver '{0}'")]
    UnknownDialect(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("SQL generation failed: {0}")]
    SqlGenerationFailed(String),

    #[error("Schema loading failed: {0}")]
    SchemaLoadFailed(String),

    #[error("Table operation failed: {0}")]
    TableOperationFailed(String),

    #[error("Table design change failed: {0}")]
    DesignFailed(String),

    #[error("Table {0} has no key columns to identify a row")]
    NoRowIdentity(String),
}

impl ServiceError {
    /// Map a rendering failure, keeping unsupported operations distinguishable
    pub(crate) fn from_render(error: CoreError) -> Self {
        if error.is_unsupported() {
            ServiceError::Unsupported(error.to_string())
        } else {
            ServiceError::SqlGenerationFailed(error.to_string())
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, ServiceError::Unsupported(_))
    }
}
