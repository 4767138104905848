//! Shared fixtures for integration tests
//!
//! - Catalog entry builders
//! - In-memory catalog and image sources with switchable failures
//! - Captured admin API payloads under tests/fixtures/resolver

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use catalog_merge::{
    CatalogEntry, CatalogSource, ImageSource, Money, ProductImage, UpstreamError, Variant,
};

/// Directory holding captured resolver payloads
pub fn resolver_fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/resolver")
}

pub fn variant(id: u64, color: &str, size: &str) -> Variant {
    Variant {
        id: format!("gid://shopify/ProductVariant/{}", id),
        size: Some(size.to_string()),
        color: Some(color.to_string()),
        price: Money::new("28.00", "USD"),
        available_for_sale: true,
        image: None,
    }
}

/// Entry with one variant per size in a single color.
pub fn entry(product_id: u64, handle: &str, color: &str, first_variant: u64) -> CatalogEntry {
    let sizes = ["S", "M", "L"];
    let mut e = CatalogEntry::new(format!("gid://shopify/Product/{}", product_id), handle);
    e.title = handle.replace('-', " ");
    e.variants = sizes
        .iter()
        .enumerate()
        .map(|(i, size)| variant(first_variant + i as u64, color, size))
        .collect();
    e.images = vec![
        format!("https://cdn.example.com/{}/front.jpg", handle),
        format!("https://cdn.example.com/{}/back.jpg", handle),
    ];
    e.colors = vec![color.to_string()];
    e.sizes = sizes.iter().map(|s| s.to_string()).collect();
    e.images_by_color = BTreeMap::from([(color.to_string(), e.images.clone())]);
    e
}

/// Catalog keyed by handle. Handles in `failing` return a transport error.
#[derive(Default)]
pub struct FakeCatalog {
    pub entries: Vec<CatalogEntry>,
    pub failing: HashSet<String>,
    pub fail_listing: bool,
    pub lookups: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, handle: &str) -> Self {
        self.failing.insert(handle.to_string());
        self
    }
}

impl CatalogSource for FakeCatalog {
    fn product_by_handle(&self, handle: &str) -> Result<Option<CatalogEntry>, UpstreamError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(handle) {
            return Err(UpstreamError::Transport("connection reset".to_string()));
        }
        Ok(self.entries.iter().find(|e| e.handle == handle).cloned())
    }

    fn products(&self) -> Result<Vec<CatalogEntry>, UpstreamError> {
        if self.fail_listing {
            return Err(UpstreamError::Timeout);
        }
        Ok(self.entries.clone())
    }
}

/// Image source keyed by product id; unknown products fail with 404.
#[derive(Default)]
pub struct FakeImages {
    pub by_product: HashMap<String, Vec<ProductImage>>,
}

impl FakeImages {
    pub fn with(mut self, product_id: &str, images: Vec<ProductImage>) -> Self {
        self.by_product.insert(product_id.to_string(), images);
        self
    }
}

impl ImageSource for FakeImages {
    fn product_images(&self, product_id: &str) -> Result<Vec<ProductImage>, UpstreamError> {
        self.by_product
            .get(product_id)
            .cloned()
            .ok_or_else(|| UpstreamError::Status {
                status: 404,
                reason: "Not Found".to_string(),
            })
    }
}
