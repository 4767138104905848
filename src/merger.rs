//! Catalog merger
//!
//! Pure transformations over catalog entries: folding secondaries into a
//! primary, and dropping hidden entries from listings. Inputs are never
//! mutated; every function returns a new value.

use std::collections::HashSet;

use catalog_model::CatalogEntry;

use crate::cache::MergeSnapshot;

/// Entries whose handle is not hidden by `snapshot`, in their original order.
pub fn filter_hidden(entries: Vec<CatalogEntry>, snapshot: &MergeSnapshot) -> Vec<CatalogEntry> {
    if snapshot.hidden_handles().is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|e| !snapshot.is_hidden(&e.handle))
        .collect()
}

/// Fold `secondaries` into `primary`.
///
/// - variants: primary's, then each secondary's, unchanged and not deduplicated
/// - images: primary's first, then secondaries', first occurrence of a URL wins
/// - colors, sizes: union, including the options carried by secondary variants
/// - images_by_color: per color, primary's list first, URL-deduplicated
///
/// An empty `secondaries` list still deduplicates the primary's own lists.
pub fn merge_into(primary: &CatalogEntry, secondaries: &[CatalogEntry]) -> CatalogEntry {
    tracing::debug!(
        primary = %primary.handle,
        secondaries = secondaries.len(),
        "merging secondary entries into primary"
    );

    let mut merged = primary.clone();

    merged.variants = primary
        .variants
        .iter()
        .chain(secondaries.iter().flat_map(|s| s.variants.iter()))
        .cloned()
        .collect();

    merged.images = dedup(
        primary
            .images
            .iter()
            .chain(secondaries.iter().flat_map(|s| s.images.iter())),
    );

    merged.colors = dedup(primary.colors.iter().chain(secondaries.iter().flat_map(|s| {
        s.colors
            .iter()
            .chain(s.variants.iter().filter_map(|v| v.color.as_ref()))
    })));

    merged.sizes = dedup(primary.sizes.iter().chain(secondaries.iter().flat_map(|s| {
        s.sizes
            .iter()
            .chain(s.variants.iter().filter_map(|v| v.size.as_ref()))
    })));

    let mut by_color = primary.images_by_color.clone();
    for secondary in secondaries {
        for (color, images) in &secondary.images_by_color {
            by_color
                .entry(color.clone())
                .or_default()
                .extend(images.iter().cloned());
        }
    }
    merged.images_by_color = by_color
        .into_iter()
        .map(|(color, images)| (color, dedup(images.iter())))
        .collect();

    merged
}

/// Entries an operator may pick as the secondary for `primary`: everything
/// except the primary itself and handles already used as a secondary.
pub fn available_secondaries<'a>(
    entries: &'a [CatalogEntry],
    snapshot: &MergeSnapshot,
    primary: &str,
) -> Vec<&'a CatalogEntry> {
    entries
        .iter()
        .filter(|e| e.handle != primary && !snapshot.is_hidden(&e.handle))
        .collect()
}

/// Keep the first occurrence of each string, in order.
fn dedup<'a>(items: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}
