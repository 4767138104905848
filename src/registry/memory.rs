//! In-process directive store.

use std::sync::RwLock;

use super::directive::{check_new, MergeDirective};
use super::store::{DirectiveStore, StoreError};
use crate::error::MergeError;

/// Directive store held in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    directives: RwLock<Vec<MergeDirective>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("memory store lock poisoned".to_string())
    }
}

impl DirectiveStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<MergeDirective>, StoreError> {
        let directives = self.directives.read().map_err(|_| Self::poisoned())?;
        Ok(directives.clone())
    }

    fn insert_checked(&self, directive: MergeDirective) -> Result<MergeDirective, MergeError> {
        let mut directives = self.directives.write().map_err(|_| Self::poisoned())?;
        check_new(
            &directives,
            &directive.primary_handle,
            &directive.secondary_handle,
        )?;
        directives.push(directive.clone());
        Ok(directive)
    }

    fn remove(&self, id: &str) -> Result<Option<MergeDirective>, StoreError> {
        let mut directives = self.directives.write().map_err(|_| Self::poisoned())?;
        let removed = directives
            .iter()
            .position(|d| d.id == id)
            .map(|idx| directives.remove(idx));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ValidationError;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_insert_and_remove() {
        let store = MemoryStore::new();
        let d = store.insert_checked(MergeDirective::new("p", "s")).unwrap();

        assert_eq!(store.load_all().unwrap().len(), 1);
        assert_eq!(store.find_by_secondary("s").unwrap().unwrap().id, d.id);

        let removed = store.remove(&d.id).unwrap();
        assert_eq!(removed.unwrap().id, d.id);
        assert!(store.load_all().unwrap().is_empty());
        assert!(store.remove(&d.id).unwrap().is_none());
    }

    #[test]
    fn test_rejected_insert_writes_nothing() {
        let store = MemoryStore::new();
        store.insert_checked(MergeDirective::new("p", "s")).unwrap();

        let err = store
            .insert_checked(MergeDirective::new("s", "p"))
            .unwrap_err();
        assert!(matches!(
            err,
            MergeError::Validation(ValidationError::AlreadyMerged { .. })
        ));
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_inserts_same_secondary_one_wins() {
        let store = Arc::new(MemoryStore::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .insert_checked(MergeDirective::new(format!("p{}", i), "shared"))
                        .is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(store.load_all().unwrap().len(), 1);
    }
}
