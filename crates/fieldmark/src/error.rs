use thiserror::Error;

use crate::store::StorageError;

/// Main error type for fieldmark
#[derive(Error, Debug)]
pub enum FieldmarkError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FieldmarkError>;

impl FieldmarkError {
    /// Create a configuration error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid parameter error from a message
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorageErrorCode;

    #[test]
    fn test_invalid_parameter_display() {
        let err = FieldmarkError::invalid_param("points must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid parameter: points must not be empty"
        );
    }

    #[test]
    fn test_storage_error_passes_through() {
        let err = FieldmarkError::from(StorageError::session_not_found());
        assert_eq!(err.to_string(), "Session not found");
        match err {
            FieldmarkError::Storage(inner) => {
                assert_eq!(inner.code, StorageErrorCode::SessionNotFound);
                assert!(!inner.retry);
            }
            other => panic!("expected Storage variant, got {other:?}"),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = FieldmarkError::config("missing bucket");
        assert_eq!(err.to_string(), "Configuration error: missing bucket");
    }
}
