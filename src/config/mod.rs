//! Layered configuration
//!
//! Merged in order, last wins:
//! 1. Built-in defaults
//! 2. Host/user config (~/.config/catalog-merge/config.toml)
//! 3. Local config (./catalog-merge.toml or --config)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

use std::path::PathBuf;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers};

/// Local config file name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "catalog-merge.toml";

/// Host config path, if a home directory is known.
pub fn host_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("catalog-merge")
            .join("config.toml")
    })
}
