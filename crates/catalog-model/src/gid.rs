//! Upstream global identifiers.
//!
//! The storefront API hands out ids like `gid://shopify/ProductVariant/42`
//! while the admin API speaks bare numbers. Both forms are accepted wherever
//! an id is parsed.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Resource kind for product ids.
pub const PRODUCT: &str = "Product";

/// Resource kind for variant ids.
pub const PRODUCT_VARIANT: &str = "ProductVariant";

fn gid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^gid://shopify/([A-Za-z]+)/([0-9]+)$").expect("gid pattern is valid")
    })
}

/// Extract the numeric id from a gid of the given kind, or from a bare number.
///
/// Returns `None` for a gid of another kind or anything non-numeric.
pub fn numeric_id(id: &str, kind: &str) -> Option<u64> {
    let id = id.trim();
    if let Some(caps) = gid_pattern().captures(id) {
        if &caps[1] != kind {
            return None;
        }
        return caps[2].parse().ok();
    }
    id.parse().ok()
}

/// Build a gid of the given kind.
pub fn to_gid(kind: &str, id: u64) -> String {
    format!("gid://shopify/{}/{}", kind, id)
}
