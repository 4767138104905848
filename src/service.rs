//! Merge service
//!
//! Facade tying the registry, the cache, the merger and the color resolver
//! together for page and admin callers.

use std::sync::Arc;

use catalog_model::{CatalogEntry, CatalogSource, ImageSource, Variant};

use crate::cache::{CacheStats, MergeCache};
use crate::error::MergeError;
use crate::merger;
use crate::registry::{MergeDirective, MergeRegistry};
use crate::resolver::{self, ColorImageMap};

/// Outcome of assembling a product detail view.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductDetail {
    /// The requested handle is a secondary; show its primary instead.
    Redirect { to: String },
    /// Primary entry with every secondary folded in.
    Found(CatalogEntry),
    NotFound,
}

#[derive(Clone)]
pub struct MergeService {
    registry: MergeRegistry,
    cache: Arc<MergeCache>,
}

impl MergeService {
    pub fn new(registry: MergeRegistry, cache: Arc<MergeCache>) -> Self {
        Self { registry, cache }
    }

    pub fn registry(&self) -> &MergeRegistry {
        &self.registry
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop entries whose handle is currently a secondary.
    pub fn filter_hidden_products(
        &self,
        entries: Vec<CatalogEntry>,
    ) -> Result<Vec<CatalogEntry>, MergeError> {
        let snapshot = self.cache.read()?;
        Ok(merger::filter_hidden(entries, &snapshot))
    }

    pub fn get_secondary_handles(&self, primary: &str) -> Result<Vec<String>, MergeError> {
        Ok(self.cache.read()?.secondaries_of(primary).to_vec())
    }

    pub fn get_primary_for_secondary(&self, handle: &str) -> Result<Option<String>, MergeError> {
        Ok(self.cache.read()?.primary_of(handle).map(str::to_string))
    }

    pub fn merge_product_variants(
        &self,
        primary: &CatalogEntry,
        secondaries: &[CatalogEntry],
    ) -> CatalogEntry {
        merger::merge_into(primary, secondaries)
    }

    /// Never fails; upstream trouble yields an empty map.
    pub fn get_images_by_color(
        &self,
        images: &dyn ImageSource,
        product_id: &str,
        variants: &[Variant],
    ) -> ColorImageMap {
        resolver::images_by_color(images, product_id, variants)
    }

    /// Record a directive and invalidate the cache on success.
    pub fn create_merge(&self, primary: &str, secondary: &str) -> Result<MergeDirective, MergeError> {
        let directive = self.registry.create(primary, secondary)?;
        self.cache.invalidate();
        Ok(directive)
    }

    /// Remove a directive and invalidate the cache on success.
    pub fn delete_merge(&self, id: &str) -> Result<MergeDirective, MergeError> {
        let directive = self.registry.delete(id)?;
        self.cache.invalidate();
        Ok(directive)
    }

    /// All directives, newest first. Reads the store directly.
    pub fn list_merges(&self) -> Result<Vec<MergeDirective>, MergeError> {
        Ok(self.registry.list()?)
    }

    /// Candidates for a new directive under `primary`.
    pub fn available_secondaries(
        &self,
        entries: &[CatalogEntry],
        primary: &str,
    ) -> Result<Vec<CatalogEntry>, MergeError> {
        let snapshot = self.cache.read()?;
        Ok(merger::available_secondaries(entries, &snapshot, primary)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Product listing with secondaries removed unless `include_hidden`.
    pub fn listing(
        &self,
        source: &dyn CatalogSource,
        include_hidden: bool,
    ) -> Result<Vec<CatalogEntry>, MergeError> {
        let entries = source.products()?;
        if include_hidden {
            return Ok(entries);
        }
        self.filter_hidden_products(entries)
    }

    /// Assemble the detail view for `handle`.
    ///
    /// A failed primary fetch is returned as an error. Secondaries that are
    /// missing or fail to load are skipped. Each fetched product has its
    /// images regrouped by color before the merge, so every color key from
    /// a secondary survives into the merged map.
    pub fn product_detail(
        &self,
        source: &dyn CatalogSource,
        images: &dyn ImageSource,
        handle: &str,
    ) -> Result<ProductDetail, MergeError> {
        let handle = handle.trim();
        let snapshot = self.cache.read()?;

        if let Some(primary) = snapshot.primary_of(handle) {
            tracing::debug!(handle, primary, "secondary requested, redirecting");
            return Ok(ProductDetail::Redirect {
                to: primary.to_string(),
            });
        }

        let Some(mut primary) = source.product_by_handle(handle)? else {
            return Ok(ProductDetail::NotFound);
        };
        self.apply_color_images(images, &mut primary);

        let mut secondaries = Vec::new();
        for secondary in snapshot.secondaries_of(handle) {
            match source.product_by_handle(secondary) {
                Ok(Some(mut entry)) => {
                    self.apply_color_images(images, &mut entry);
                    secondaries.push(entry);
                }
                Ok(None) => {
                    tracing::warn!(primary = handle, secondary = %secondary, "secondary product missing, skipping");
                }
                Err(e) => {
                    tracing::warn!(primary = handle, secondary = %secondary, error = %e, "secondary product unavailable, skipping");
                }
            }
        }

        Ok(ProductDetail::Found(merger::merge_into(&primary, &secondaries)))
    }

    /// Regroup one product's images by color from its own upstream tags.
    ///
    /// The upstream image API is per product, so each entry is resolved
    /// before merging. An empty result keeps the entry's own map.
    fn apply_color_images(&self, images: &dyn ImageSource, entry: &mut CatalogEntry) {
        let by_color = resolver::images_by_color(images, &entry.id, &entry.variants);
        if !by_color.is_empty() {
            entry.images_by_color = by_color.into_btree_map();
        }
    }
}
