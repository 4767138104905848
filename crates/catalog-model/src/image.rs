//! Raw product image records from the upstream admin API.

use serde::{Deserialize, Serialize};

/// One product image with its variant associations.
///
/// Field names follow the admin API payload (`snake_case`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    #[serde(default)]
    pub id: u64,
    /// 1-based display position assigned by the platform.
    pub position: u32,
    /// Source URL.
    pub src: String,
    /// Numeric ids of the variants this image is tagged with.
    #[serde(default)]
    pub variant_ids: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl ProductImage {
    pub fn new(position: u32, src: impl Into<String>) -> Self {
        Self {
            id: 0,
            position,
            src: src.into(),
            variant_ids: Vec::new(),
            alt: None,
        }
    }

    /// Tag this image with variant ids.
    pub fn with_variants(mut self, variant_ids: impl IntoIterator<Item = u64>) -> Self {
        self.variant_ids.extend(variant_ids);
        self
    }

    /// Whether the platform links this image to at least one variant.
    pub fn is_associated(&self) -> bool {
        !self.variant_ids.is_empty()
    }
}

/// Envelope of `GET /products/{id}/images.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    pub images: Vec<ProductImage>,
}
