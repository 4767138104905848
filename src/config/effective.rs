//! Effective configuration with full provenance
//!
//! The effective config captures the merged configuration plus
//! information about where each value came from. Secrets are redacted in
//! the serialized form only; typed accessors read the unredacted values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use catalog_upstream::AdminApiConfig;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;

/// Schema version for effective config output
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "catalog-merge/effective_config@1";

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Local,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object, secrets redacted
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,

    #[serde(skip)]
    raw: Value,
}

/// Keys that contain secrets and should be redacted
const SECRET_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "private_key",
    "api_key",
    "credential",
];

impl EffectiveConfig {
    /// Build effective config from layers
    pub fn build(
        host_config_path: Option<&Path>,
        local_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        // Layer 2: Host config
        if let Some(path) = host_config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Host,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        // Layer 3: Local config
        if let Some(path) = local_config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Local,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        // Layer 4: CLI overrides
        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let raw = merge_layers(layers);
        Self::validate_config(&raw)?;

        let mut config = raw.clone();
        let redactions = Self::redact_secrets(&mut config);

        tracing::debug!(
            sources = sources.len(),
            redactions = redactions.len(),
            "effective config built"
        );

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config,
            sources,
            redactions,
            raw,
        })
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents).map_err(|e| {
            ConfigError::ParseError(format!("{}: TOML parse error: {}", path.display(), e))
        })?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    /// Convert TOML Value to JSON Value
    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    /// Redact secrets in the config, returning list of redacted paths
    fn redact_secrets(value: &mut Value) -> Vec<String> {
        let mut redactions = Vec::new();
        Self::redact_recursive(value, String::new(), &mut redactions);
        redactions
    }

    fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let current_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };

                    let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

                    if is_secret && !val.is_object() && !val.is_array() {
                        *val = Value::String("[REDACTED]".to_string());
                        redactions.push(current_path);
                    } else {
                        Self::redact_recursive(val, current_path, redactions);
                    }
                }
            }
            Value::Array(arr) => {
                for (i, val) in arr.iter_mut().enumerate() {
                    let current_path = format!("{}[{}]", path, i);
                    Self::redact_recursive(val, current_path, redactions);
                }
            }
            _ => {}
        }
    }

    /// Validate configuration values
    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        let at = |path: &str| lookup(config, path);

        // cache.ttl_seconds must be in [1, 86400]
        match at("cache.ttl_seconds").map(Value::as_u64) {
            Some(Some(1..=86400)) | None => {}
            Some(_) => {
                return Err(ConfigError::ValidationError(
                    "cache.ttl_seconds must be in [1, 86400]".to_string(),
                ))
            }
        }

        // upstream.timeout_seconds must be in [1, 300]
        match at("upstream.timeout_seconds").map(Value::as_u64) {
            Some(Some(1..=300)) | None => {}
            Some(_) => {
                return Err(ConfigError::ValidationError(
                    "upstream.timeout_seconds must be in [1, 300]".to_string(),
                ))
            }
        }

        // store.lock_timeout_ms must be positive
        match at("store.lock_timeout_ms").map(Value::as_u64) {
            Some(Some(ms)) if ms > 0 => {}
            None => {}
            Some(_) => {
                return Err(ConfigError::ValidationError(
                    "store.lock_timeout_ms must be greater than 0".to_string(),
                ))
            }
        }

        if let Some(dir) = at("store.dir") {
            if dir.as_str().map_or(true, |d| d.trim().is_empty()) {
                return Err(ConfigError::ValidationError(
                    "store.dir must be a non-empty string".to_string(),
                ));
            }
        }

        for key in ["upstream.domain", "upstream.access_token", "upstream.api_version"] {
            if at(key).is_some_and(|v| !v.is_string() && !v.is_null()) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be a string",
                    key
                )));
            }
        }

        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by path (dot-separated). Secrets read as `[REDACTED]`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.config, path)
    }

    /// Get a config value as u64
    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    /// Get a config value as string
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    fn raw_u64(&self, path: &str) -> Option<u64> {
        lookup(&self.raw, path).and_then(Value::as_u64)
    }

    fn raw_str(&self, path: &str) -> Option<&str> {
        lookup(&self.raw, path)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Merge snapshot time-to-live.
    pub fn cache_ttl(&self) -> Duration {
        let defaults = BuiltinDefaults::default();
        Duration::from_secs(
            self.raw_u64("cache.ttl_seconds")
                .unwrap_or(defaults.cache_ttl_seconds),
        )
    }

    /// Directory holding the directive document.
    pub fn store_dir(&self) -> PathBuf {
        self.raw_str("store.dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(BuiltinDefaults::default().store_dir))
    }

    /// How long a store write waits for the cross-process lock.
    pub fn lock_timeout(&self) -> Duration {
        let defaults = BuiltinDefaults::default();
        Duration::from_millis(
            self.raw_u64("store.lock_timeout_ms")
                .unwrap_or(defaults.store_lock_timeout_ms),
        )
    }

    /// Admin API connection settings, including the unredacted access token.
    pub fn upstream(&self) -> AdminApiConfig {
        let defaults = BuiltinDefaults::default();
        AdminApiConfig {
            domain: self.raw_str("upstream.domain").map(str::to_string),
            access_token: self.raw_str("upstream.access_token").map(str::to_string),
            api_version: self
                .raw_str("upstream.api_version")
                .unwrap_or(&defaults.upstream_api_version)
                .to_string(),
            timeout: Duration::from_secs(
                self.raw_u64("upstream.timeout_seconds")
                    .unwrap_or(defaults.upstream_timeout_seconds),
            ),
        }
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
