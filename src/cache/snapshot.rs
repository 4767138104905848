//! Immutable materialized view of the registry.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::registry::MergeDirective;

/// Point-in-time view of all active directives.
///
/// Built once and never mutated; a rebuild produces a new value that is
/// swapped in whole.
#[derive(Debug, Clone)]
pub struct MergeSnapshot {
    hidden_handles: BTreeSet<String>,
    merge_map: BTreeMap<String, Vec<String>>,
    built_at: Instant,
    generation: u64,
    directive_count: usize,
}

impl MergeSnapshot {
    /// Build from directives in list order (newest first).
    pub fn build(directives: &[MergeDirective], built_at: Instant, generation: u64) -> Self {
        let mut hidden_handles = BTreeSet::new();
        let mut merge_map: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for d in directives {
            hidden_handles.insert(d.secondary_handle.clone());
            merge_map
                .entry(d.primary_handle.clone())
                .or_default()
                .push(d.secondary_handle.clone());
        }

        Self {
            hidden_handles,
            merge_map,
            built_at,
            generation,
            directive_count: directives.len(),
        }
    }

    pub fn is_hidden(&self, handle: &str) -> bool {
        self.hidden_handles.contains(handle)
    }

    pub fn hidden_handles(&self) -> &BTreeSet<String> {
        &self.hidden_handles
    }

    /// Secondaries of `primary`; empty if it absorbs nothing.
    pub fn secondaries_of(&self, primary: &str) -> &[String] {
        self.merge_map
            .get(primary)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The primary that absorbs `secondary`.
    pub fn primary_of(&self, secondary: &str) -> Option<&str> {
        self.merge_map
            .iter()
            .find(|(_, secondaries)| secondaries.iter().any(|s| s == secondary))
            .map(|(primary, _)| primary.as_str())
    }

    pub fn merge_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.merge_map
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn directive_count(&self) -> usize {
        self.directive_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_groups_by_primary() {
        let directives = vec![
            MergeDirective::new("p", "s2"),
            MergeDirective::new("p", "s1"),
            MergeDirective::new("q", "s3"),
        ];
        let snap = MergeSnapshot::build(&directives, Instant::now(), 7);

        assert_eq!(snap.secondaries_of("p"), ["s2", "s1"]);
        assert_eq!(snap.secondaries_of("q"), ["s3"]);
        assert!(snap.secondaries_of("s1").is_empty());
        assert_eq!(snap.hidden_handles().len(), 3);
        assert_eq!(snap.directive_count(), 3);
        assert_eq!(snap.generation(), 7);
    }

    #[test]
    fn test_primary_lookup() {
        let directives = vec![MergeDirective::new("p", "s")];
        let snap = MergeSnapshot::build(&directives, Instant::now(), 0);

        assert_eq!(snap.primary_of("s"), Some("p"));
        assert_eq!(snap.primary_of("p"), None);
        assert!(snap.is_hidden("s"));
        assert!(!snap.is_hidden("p"));
    }

    #[test]
    fn test_no_directives_hides_nothing() {
        let snap = MergeSnapshot::build(&[], Instant::now(), 0);
        assert!(snap.hidden_handles().is_empty());
        assert!(snap.merge_map().is_empty());
    }
}
