//! Upstream admin API client
//!
//! Fetches product images together with their variant associations, which the
//! storefront API does not expose. Used by the color-image resolver through
//! the [`ImageSource`] trait.

use std::time::Duration;

use catalog_model::gid::{self, PRODUCT};
use catalog_model::image::ImagesResponse;
use catalog_model::{ImageSource, ProductImage, UpstreamError};

/// Default admin API version path segment.
pub const DEFAULT_API_VERSION: &str = "2024-01";

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Connection settings for the admin API.
#[derive(Debug, Clone)]
pub struct AdminApiConfig {
    /// Store domain, e.g. `example.myshopify.com`.
    pub domain: Option<String>,
    pub access_token: Option<String>,
    pub api_version: String,
    pub timeout: Duration,
}

impl Default for AdminApiConfig {
    fn default() -> Self {
        Self {
            domain: None,
            access_token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl AdminApiConfig {
    /// Both domain and token are present and non-empty.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.domain) && present(&self.access_token)
    }
}

/// Blocking client for `GET /admin/api/{version}/products/{id}/images.json`.
#[derive(Debug, Clone)]
pub struct AdminImageClient {
    config: AdminApiConfig,
    client: reqwest::blocking::Client,
}

impl AdminImageClient {
    pub fn new(config: AdminApiConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self { config, client }
    }

    pub fn config(&self) -> &AdminApiConfig {
        &self.config
    }

    /// Endpoint URL for a product's images. Accepts a gid or bare numeric id.
    pub fn images_url(&self, product_id: &str) -> Result<String, UpstreamError> {
        let domain = self
            .config
            .domain
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| UpstreamError::NotConfigured("store domain is not set".to_string()))?;
        let numeric = gid::numeric_id(product_id, PRODUCT)
            .ok_or_else(|| UpstreamError::InvalidId(product_id.to_string()))?;

        Ok(format!(
            "https://{}/admin/api/{}/products/{}/images.json",
            domain.trim().trim_end_matches('/'),
            self.config.api_version,
            numeric
        ))
    }
}

impl ImageSource for AdminImageClient {
    fn product_images(&self, product_id: &str) -> Result<Vec<ProductImage>, UpstreamError> {
        if !self.config.is_configured() {
            return Err(UpstreamError::NotConfigured(
                "admin API domain or access token missing".to_string(),
            ));
        }
        let url = self.images_url(product_id)?;
        let token = self.config.access_token.as_deref().unwrap_or_default();

        tracing::debug!(product_id, "fetching product images");

        let response = self
            .client
            .get(&url)
            .header(ACCESS_TOKEN_HEADER, token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout
                } else {
                    UpstreamError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body: ImagesResponse = response
            .json()
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let associated = body.images.iter().filter(|i| i.is_associated()).count();
        tracing::debug!(
            product_id,
            total = body.images.len(),
            associated,
            unassociated = body.images.len() - associated,
            "product images fetched"
        );

        Ok(body.images)
    }
}
