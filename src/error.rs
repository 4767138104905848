//! Error code registry and the top-level merge error.

use serde::Serialize;

use catalog_model::UpstreamError;

use crate::registry::{StoreError, ValidationError};

/// Stable error codes surfaced to administrative callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Directive rejected by an invariant; nothing was written
    Validation,
    /// Directive id does not exist
    NotFound,
    /// Durable store could not be read or written
    StoreUnavailable,
    /// Upstream catalog could not be reached
    UpstreamUnavailable,
}

impl ErrorCode {
    /// Returns the string representation of the error code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::StoreUnavailable => "STORE_UNAVAILABLE",
            ErrorCode::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors returned by registry, cache and listing operations.
///
/// Upstream failures only surface from listings; detail assembly and color
/// resolution degrade instead.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("merge directive not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] UpstreamError),
}

impl MergeError {
    /// Returns the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            MergeError::Validation(_) => ErrorCode::Validation,
            MergeError::NotFound(_) => ErrorCode::NotFound,
            MergeError::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            MergeError::UpstreamUnavailable(_) => ErrorCode::UpstreamUnavailable,
        }
    }

    /// Convert to the `{code, message}` payload shown to admin callers
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code().as_str(),
            message: self.to_string(),
        }
    }
}

/// Serializable error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
}
