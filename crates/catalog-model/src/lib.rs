//! Catalog model types
//!
//! Read-only shapes of the upstream commerce platform that the merge engine
//! consumes: catalog entries, their variants, raw product images, and the
//! collaborator traits used to fetch them.

pub mod entry;
pub mod error;
pub mod gid;
pub mod image;
pub mod source;

pub use entry::{CatalogEntry, Money, Variant};
pub use error::UpstreamError;
pub use image::ProductImage;
pub use source::{CatalogSource, ImageSource};
