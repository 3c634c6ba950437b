//! Preview generator trait and shared types.
//!
//! The [`PreviewGenerator`] trait is everything the gallery needs from a
//! preview subsystem: a media-type check, rendering a resource into a
//! bounding box, and overwriting a cached entry after the gallery corrected
//! it.
//!
//! The production implementation is
//! [`RustGenerator`](super::rust_backend::RustGenerator), built on the
//! `image` crate with an on-disk cache.

use super::params::PreviewSpec;
use crate::storage::{Node, Storage, StorageError};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("Encoding failed: {0}")]
    Encode(String),
    #[error("Unsupported media type: {0}")]
    Unsupported(String),
}

/// Trait for preview generators.
///
/// Generators are shared by concurrent requests, hence `Sync`.
pub trait PreviewGenerator: Sync {
    /// Whether previews can be rendered for this media type.
    fn is_mime_supported(&self, media_type: &str) -> bool;

    /// Render `resource` according to `spec` for `owner`.
    ///
    /// The result is not guaranteed to match the requested box exactly.
    fn generate<S: Storage + ?Sized>(
        &self,
        storage: &S,
        resource: &Node,
        owner: &str,
        spec: &PreviewSpec,
    ) -> Result<DynamicImage, BackendError>;

    /// Replace the cached rendering of `resource` for `spec`.
    fn overwrite_cached(
        &self,
        resource: &Node,
        owner: &str,
        spec: &PreviewSpec,
        image: &DynamicImage,
    ) -> Result<(), BackendError>;
}
