//! Merge directives and their write-time invariants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An operator-declared pairing: `secondary_handle`'s variants are shown on
/// `primary_handle`'s page and the secondary is hidden from listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeDirective {
    pub id: String,
    pub primary_handle: String,
    pub secondary_handle: String,
    pub created_at: DateTime<Utc>,
}

impl MergeDirective {
    /// Create a directive with a fresh id and the current time.
    pub fn new(primary_handle: impl Into<String>, secondary_handle: impl Into<String>) -> Self {
        Self {
            id: generate_directive_id(),
            primary_handle: primary_handle.into(),
            secondary_handle: secondary_handle.into(),
            created_at: Utc::now(),
        }
    }

    /// True if this directive joins `a` and `b`, in either orientation.
    pub fn pairs(&self, a: &str, b: &str) -> bool {
        (self.primary_handle == a && self.secondary_handle == b)
            || (self.primary_handle == b && self.secondary_handle == a)
    }
}

/// Generate a new directive id (lowercase ULID).
pub fn generate_directive_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

/// Reasons a new directive is rejected. None of them leaves a side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("handle must not be empty")]
    EmptyHandle,

    #[error("cannot merge a product with itself: {handle}")]
    SelfMerge { handle: String },

    #[error("already merged: {primary} and {secondary}")]
    AlreadyMerged { primary: String, secondary: String },

    #[error("secondary already used: {secondary} is a secondary in another merge")]
    SecondaryAlreadyUsed { secondary: String },
}

/// Check a proposed `(primary, secondary)` pair against the existing directives.
///
/// Must run inside the same critical section as the insert that follows it.
pub fn check_new(
    existing: &[MergeDirective],
    primary: &str,
    secondary: &str,
) -> Result<(), ValidationError> {
    if primary.is_empty() || secondary.is_empty() {
        return Err(ValidationError::EmptyHandle);
    }
    if primary == secondary {
        return Err(ValidationError::SelfMerge {
            handle: primary.to_string(),
        });
    }
    if existing.iter().any(|d| d.pairs(primary, secondary)) {
        return Err(ValidationError::AlreadyMerged {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
        });
    }
    if existing.iter().any(|d| d.secondary_handle == secondary) {
        return Err(ValidationError::SecondaryAlreadyUsed {
            secondary: secondary.to_string(),
        });
    }
    Ok(())
}

/// Order directives most-recently-created first.
///
/// Input is in insertion order; ties on `created_at` keep the later insert first.
pub fn newest_first(mut directives: Vec<MergeDirective>) -> Vec<MergeDirective> {
    directives.reverse();
    directives.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    directives
}
