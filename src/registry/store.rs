//! Durable store seam for merge directives.

use std::io;
use std::time::Duration;

use thiserror::Error;

use super::directive::MergeDirective;
use crate::error::MergeError;

/// Errors from directive store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("store document is corrupt: {0}")]
    Corrupt(String),

    #[error("unsupported store schema version {0}")]
    UnsupportedSchema(u32),

    #[error("store lock timeout after {0:?}")]
    LockTimeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for merge directives.
///
/// Implementations must make `insert_checked` and `remove` linearizable: the
/// uniqueness check and the write happen in one critical section.
pub trait DirectiveStore: Send + Sync {
    /// All directives in insertion order.
    fn load_all(&self) -> Result<Vec<MergeDirective>, StoreError>;

    /// Validate `directive` against the stored set and insert it atomically.
    ///
    /// Returns `MergeError::Validation` without writing anything if an
    /// invariant would be broken.
    fn insert_checked(&self, directive: MergeDirective) -> Result<MergeDirective, MergeError>;

    /// Remove a directive by id, returning it if it existed.
    fn remove(&self, id: &str) -> Result<Option<MergeDirective>, StoreError>;

    /// The directive using `secondary` as its secondary, if any.
    fn find_by_secondary(&self, secondary: &str) -> Result<Option<MergeDirective>, StoreError> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|d| d.secondary_handle == secondary))
    }

    /// The directive joining `a` and `b` in either orientation, if any.
    fn find_pair(&self, a: &str, b: &str) -> Result<Option<MergeDirective>, StoreError> {
        Ok(self.load_all()?.into_iter().find(|d| d.pairs(a, b)))
    }
}
