//! Collaborator traits for the upstream platform.

use crate::entry::CatalogEntry;
use crate::error::UpstreamError;
use crate::image::ProductImage;

/// Source of raw product images with variant associations.
pub trait ImageSource: Send + Sync {
    /// Fetch every image of a product, in whatever order the platform returns them.
    fn product_images(&self, product_id: &str) -> Result<Vec<ProductImage>, UpstreamError>;
}

/// Source of catalog entries (the storefront product API).
pub trait CatalogSource: Send + Sync {
    /// Fetch one product by handle. `Ok(None)` when the handle does not exist.
    fn product_by_handle(&self, handle: &str) -> Result<Option<CatalogEntry>, UpstreamError>;

    /// Fetch the full product listing.
    fn products(&self) -> Result<Vec<CatalogEntry>, UpstreamError>;
}
