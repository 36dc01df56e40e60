//! Storage error taxonomy and failure classification
//!
//! Native blob-store failures never leak past the session store boundary.
//! Every failure is funneled through the classifiers here into a
//! [`StorageError`], a value type the UI can key retry/repair actions on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::blob::{codes, BlobError};

/// Stable, UI-actionable failure categories.
///
/// `IndexNotFound`, `IndexCorrupted` and `InvalidData` are reserved for
/// forward compatibility and never constructed by this crate: index absence
/// is treated as "no sessions yet" and index corruption falls back to an
/// empty index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageErrorCode {
    NotAuthenticated,
    SessionNotFound,
    IndexNotFound,
    IndexCorrupted,
    NetworkError,
    PermissionDenied,
    QuotaExceeded,
    InvalidData,
    Unknown,
}

/// A classified storage failure.
///
/// `retry: true` hints that the UI may offer a retry action; `false` means
/// retrying is futile without a changed precondition (e.g. signing in).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct StorageError {
    pub code: StorageErrorCode,
    pub message: String,
    pub retry: bool,
}

impl StorageError {
    fn new(code: StorageErrorCode, message: impl Into<String>, retry: bool) -> Self {
        Self {
            code,
            message: message.into(),
            retry,
        }
    }

    /// No signed-in identity exists, before any operation was attempted
    pub fn not_authenticated() -> Self {
        Self::new(
            StorageErrorCode::NotAuthenticated,
            "Not authenticated",
            false,
        )
    }

    /// A blob fetch resolved to an explicit not-found condition
    pub fn session_not_found() -> Self {
        Self::new(StorageErrorCode::SessionNotFound, "Session not found", false)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::NetworkError, message, true)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::PermissionDenied, message, false)
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::QuotaExceeded, message, false)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::Unknown, message, true)
    }
}

/// Classify a native blob-store failure. Total: every input maps to a valid
/// `StorageError`; anything unrecognized becomes a retryable `Unknown`.
pub fn map_blob_error(err: &BlobError) -> StorageError {
    match err {
        BlobError::Code { code, message } => match code.as_str() {
            codes::OBJECT_NOT_FOUND => StorageError::session_not_found(),
            codes::UNAUTHORIZED => {
                StorageError::permission_denied(detail("Permission denied", message))
            }
            codes::QUOTA_EXCEEDED => {
                StorageError::quota_exceeded(detail("Storage quota exceeded", message))
            }
            codes::NETWORK_ERROR | codes::RETRY_LIMIT_EXCEEDED => {
                StorageError::network(detail("Network error", message))
            }
            other => StorageError::unknown(format!("Storage error ({other})")),
        },
        BlobError::Http(e) => {
            if e.is_connect() || e.is_timeout() || e.is_request() {
                StorageError::network(format!("Network error: {e}"))
            } else {
                StorageError::unknown(format!("Storage error: {e}"))
            }
        }
    }
}

/// Classify a JSON decode failure of a stored document
pub fn map_json_error(err: &serde_json::Error) -> StorageError {
    StorageError::unknown(format!("Failed to parse stored data: {err}"))
}

fn detail(prefix: &str, message: &str) -> String {
    if message.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}
