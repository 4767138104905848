//! Color-image resolver
//!
//! Rebuilds a color → images grouping for a product. The upstream platform
//! reliably tags only one swatch image per color variant; every other photo
//! arrives untagged. Tagged images fix the color order and each color's
//! first image. Untagged images are dealt out in position order, assuming
//! they were uploaded in batches grouped by that same color order:
//!
//! - `base = untagged / colors`, `remainder = untagged % colors`
//! - the first `remainder` colors take `base + 1` images, the rest `base`
//!
//! This is a heuristic. Products whose photos were not uploaded color by
//! color will be mis-grouped; that is accepted.

use std::collections::{BTreeMap, HashMap};

use serde::ser::{Serialize, SerializeMap, Serializer};

use catalog_model::gid::{self, PRODUCT_VARIANT};
use catalog_model::{ImageSource, ProductImage, Variant};

/// Color → ordered image URLs, iterated in discovered color order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorImageMap {
    entries: Vec<(String, Vec<String>)>,
}

impl ColorImageMap {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of colors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, color: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(c, _)| c == color)
            .map(|(_, images)| images.as_slice())
    }

    /// Colors in discovered order.
    pub fn colors(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(c, images)| (c.as_str(), images.as_slice()))
    }

    /// Total images across all colors.
    pub fn image_count(&self) -> usize {
        self.entries.iter().map(|(_, images)| images.len()).sum()
    }

    pub fn into_btree_map(self) -> BTreeMap<String, Vec<String>> {
        self.entries.into_iter().collect()
    }
}

impl Serialize for ColorImageMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (color, images) in &self.entries {
            map.serialize_entry(color, images)?;
        }
        map.end()
    }
}

/// Group `images` by color using the variant tags and positional ordering.
///
/// Returns an empty map when no tagged image resolves to a colored variant;
/// callers then fall back to the flat image list.
pub fn resolve_color_images(images: &[ProductImage], variants: &[Variant]) -> ColorImageMap {
    let variant_colors: HashMap<u64, &str> = variants
        .iter()
        .filter_map(|v| {
            let color = v.color.as_deref().filter(|c| !c.is_empty())?;
            let id = gid::numeric_id(&v.id, PRODUCT_VARIANT)?;
            Some((id, color))
        })
        .collect();

    let (mut tagged, mut untagged): (Vec<&ProductImage>, Vec<&ProductImage>) =
        images.iter().partition(|img| img.is_associated());
    tagged.sort_by_key(|img| img.position);
    untagged.sort_by_key(|img| img.position);

    let mut entries: Vec<(String, Vec<String>)> = Vec::new();
    for img in tagged {
        let first_new_color = img
            .variant_ids
            .iter()
            .filter_map(|id| variant_colors.get(id).copied())
            .find(|color| !entries.iter().any(|(c, _)| c == color));

        if let Some(color) = first_new_color {
            entries.push((color.to_string(), vec![img.src.clone()]));
        }
    }

    if entries.is_empty() {
        tracing::debug!(
            images = images.len(),
            "no colored variant tags found, color grouping unavailable"
        );
        return ColorImageMap::default();
    }

    let base = untagged.len() / entries.len();
    let remainder = untagged.len() % entries.len();

    let mut pending = untagged.into_iter();
    for (index, (_, color_images)) in entries.iter_mut().enumerate() {
        let take = base + usize::from(index < remainder);
        color_images.extend(pending.by_ref().take(take).map(|img| img.src.clone()));
    }

    tracing::debug!(
        colors = entries.len(),
        per_color = base,
        remainder,
        "resolved color image groups"
    );

    ColorImageMap { entries }
}

/// Fetch a product's images and group them by color.
///
/// Upstream failures degrade to an empty map; they never reach the caller.
pub fn images_by_color(
    source: &dyn ImageSource,
    product_id: &str,
    variants: &[Variant],
) -> ColorImageMap {
    match source.product_images(product_id) {
        Ok(images) => resolve_color_images(&images, variants),
        Err(e) => {
            tracing::warn!(product_id, error = %e, "product images unavailable, skipping color grouping");
            ColorImageMap::default()
        }
    }
}
