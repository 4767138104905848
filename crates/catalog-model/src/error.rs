//! Upstream failure type.

use thiserror::Error;

/// Failure talking to the upstream catalog platform.
///
/// Callers in the merge engine degrade on every variant of this error; none
/// of them is fatal to a page render.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream API not configured: {0}")]
    NotConfigured(String),

    #[error("upstream returned HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("upstream response could not be decoded: {0}")]
    Decode(String),

    #[error("invalid upstream identifier: {0}")]
    InvalidId(String),
}
