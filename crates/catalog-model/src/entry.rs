//! Catalog entry and variant types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A price as carried by the upstream platform.
///
/// The amount stays a decimal string; this subsystem never does arithmetic on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: String,
    pub currency_code: String,
}

impl Money {
    pub fn new(amount: impl Into<String>, currency_code: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            currency_code: currency_code.into(),
        }
    }
}

/// One sellable line of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Upstream variant identifier (cart and checkout reference this).
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub available_for_sale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A product as the storefront presents it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub handle: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Image URLs in display order.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub images_by_color: BTreeMap<String, Vec<String>>,
}

impl CatalogEntry {
    /// Create an empty entry with the given id and handle.
    pub fn new(id: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handle: handle.into(),
            title: String::new(),
            variants: Vec::new(),
            images: Vec::new(),
            colors: Vec::new(),
            sizes: Vec::new(),
            images_by_color: BTreeMap::new(),
        }
    }

    /// Look up a variant by its upstream id.
    pub fn variant(&self, id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }
}
