//! Merge registry
//!
//! Durable record of merge directives. Writes enforce:
//! - no self merge
//! - no duplicate pair, in either orientation
//! - a handle is a secondary in at most one directive
//!
//! Primaries are unconstrained; one primary may absorb many secondaries.

mod directive;
mod file;
mod lock;
mod memory;
mod store;

pub use directive::{check_new, generate_directive_id, newest_first, MergeDirective, ValidationError};
pub use file::FileStore;
pub use lock::StoreLock;
pub use memory::MemoryStore;
pub use store::{DirectiveStore, StoreError};

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::MergeError;

/// Administrative and lookup operations over a [`DirectiveStore`].
#[derive(Clone)]
pub struct MergeRegistry {
    store: Arc<dyn DirectiveStore>,
}

impl MergeRegistry {
    pub fn new(store: Arc<dyn DirectiveStore>) -> Self {
        Self { store }
    }

    /// Declare that `secondary` folds into `primary`. Handles are trimmed.
    pub fn create(&self, primary: &str, secondary: &str) -> Result<MergeDirective, MergeError> {
        let (primary, secondary) = (primary.trim(), secondary.trim());
        tracing::debug!(primary, secondary, "creating merge directive");

        match self.store.insert_checked(MergeDirective::new(primary, secondary)) {
            Ok(directive) => {
                tracing::info!(id = %directive.id, primary, secondary, "merge directive created");
                Ok(directive)
            }
            Err(e) => {
                tracing::info!(primary, secondary, error = %e, "merge directive rejected");
                Err(e)
            }
        }
    }

    /// Remove a directive by id.
    pub fn delete(&self, id: &str) -> Result<MergeDirective, MergeError> {
        match self.store.remove(id)? {
            Some(directive) => {
                tracing::info!(id, secondary = %directive.secondary_handle, "merge directive deleted");
                Ok(directive)
            }
            None => Err(MergeError::NotFound(id.to_string())),
        }
    }

    /// All directives, most recently created first.
    pub fn list(&self) -> Result<Vec<MergeDirective>, StoreError> {
        Ok(newest_first(self.store.load_all()?))
    }

    /// Every handle currently used as a secondary.
    pub fn hidden_handles(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .store
            .load_all()?
            .into_iter()
            .map(|d| d.secondary_handle)
            .collect())
    }

    /// Secondaries folded into `primary`, most recent first.
    pub fn secondaries_of(&self, primary: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|d| d.primary_handle == primary)
            .map(|d| d.secondary_handle)
            .collect())
    }

    /// The primary that absorbs `secondary`, if it is one.
    pub fn primary_of(&self, secondary: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .find_by_secondary(secondary)?
            .map(|d| d.primary_handle))
    }
}
