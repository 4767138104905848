//! Catalog merge engine
//!
//! Folds "secondary" catalog products into a "primary" one: operators
//! record merge directives, listings hide secondaries, and detail views
//! show the primary with every secondary's variants and images attached.
//! Images are regrouped by color from upstream variant tags.

pub mod cache;
pub mod config;
pub mod error;
pub mod merger;
pub mod registry;
pub mod resolver;
pub mod service;

pub use cache::{CacheStats, MergeCache, MergeSnapshot};
pub use error::{ErrorCode, ErrorPayload, MergeError};
pub use registry::{
    DirectiveStore, FileStore, MemoryStore, MergeDirective, MergeRegistry, StoreError,
    ValidationError,
};
pub use resolver::ColorImageMap;
pub use service::{MergeService, ProductDetail};

pub use catalog_model::{
    CatalogEntry, CatalogSource, ImageSource, Money, ProductImage, UpstreamError, Variant,
};
