//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Merge snapshot time-to-live in seconds (default: 60)
    pub cache_ttl_seconds: u64,

    /// Directory holding merges.json (default: ".catalog-merge")
    pub store_dir: String,

    /// How long a write waits for the store lock, in milliseconds (default: 5000)
    pub store_lock_timeout_ms: u64,

    /// Admin API version segment (default: "2024-01")
    pub upstream_api_version: String,

    /// Upstream request timeout in seconds (default: 10)
    pub upstream_timeout_seconds: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 60,
            store_dir: ".catalog-merge".to_string(),
            store_lock_timeout_ms: 5000,
            upstream_api_version: catalog_upstream::DEFAULT_API_VERSION.to_string(),
            upstream_timeout_seconds: 10,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "cache": {
                "ttl_seconds": self.cache_ttl_seconds
            },
            "store": {
                "dir": self.store_dir,
                "lock_timeout_ms": self.store_lock_timeout_ms
            },
            "upstream": {
                "api_version": self.upstream_api_version,
                "timeout_seconds": self.upstream_timeout_seconds
            }
        })
    }
}
