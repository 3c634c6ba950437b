//! Pure Rust preview generator.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory_with_format` |
//! | Bounded resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Square crop | `DynamicImage::resize_to_fill` |
//! | Cache | [`PreviewCache`] (PNG files under the configured cache dir) |

use super::backend::{BackendError, PreviewGenerator};
use super::calculations::{fill_box, fit_within};
use super::params::PreviewSpec;
use crate::cache::{CacheStats, PreviewCache};
use crate::storage::{Node, Storage};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

/// Media types whose decoders the `image` features of this crate compile in.
const DECODER_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("image/jpeg", ImageFormat::Jpeg),
    ("image/png", ImageFormat::Png),
    ("image/tiff", ImageFormat::Tiff),
    ("image/webp", ImageFormat::WebP),
];

static SUPPORTED_MEDIA_TYPES: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    DECODER_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(media_type, _)| *media_type)
        .collect()
});

/// Media types with a working decoder.
pub fn supported_media_types() -> &'static [&'static str] {
    &SUPPORTED_MEDIA_TYPES
}

fn format_for(media_type: &str) -> Option<ImageFormat> {
    DECODER_CANDIDATES
        .iter()
        .find(|(t, fmt)| *t == media_type && fmt.reading_enabled())
        .map(|(_, fmt)| *fmt)
}

/// Generator backed by the `image` crate and a [`PreviewCache`].
pub struct RustGenerator {
    cache: PreviewCache,
    hits: AtomicU32,
    misses: AtomicU32,
}

impl RustGenerator {
    pub fn new(cache: PreviewCache) -> Self {
        Self {
            cache,
            hits: AtomicU32::new(0),
            misses: AtomicU32::new(0),
        }
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    /// Cache hits and misses since construction.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Resize a decoded source according to `spec`.
fn render(img: DynamicImage, spec: &PreviewSpec) -> DynamicImage {
    let raw = (img.width(), img.height());
    if spec.keep_aspect {
        let (w, h) = fit_within(raw, (spec.width, spec.height), spec.scale_up);
        if (w, h) == raw {
            img
        } else {
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
    } else {
        let (w, h) = fill_box(raw, (spec.width, spec.height), spec.scale_up);
        img.resize_to_fill(w, h, FilterType::Lanczos3)
    }
}

impl PreviewGenerator for RustGenerator {
    fn is_mime_supported(&self, media_type: &str) -> bool {
        format_for(media_type).is_some()
    }

    fn generate<S: Storage + ?Sized>(
        &self,
        storage: &S,
        resource: &Node,
        owner: &str,
        spec: &PreviewSpec,
    ) -> Result<DynamicImage, BackendError> {
        let format = format_for(&resource.media_type)
            .ok_or_else(|| BackendError::Unsupported(resource.media_type.clone()))?;

        if let Some(cached) = self.cache.load(owner, &resource.id, spec, resource.mtime) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(path = %resource.path, "preview cache hit");
            return Ok(cached);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let bytes = storage.read(resource)?;
        let img = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
            BackendError::Decode {
                path: resource.path.clone(),
                message: e.to_string(),
            }
        })?;
        let rendered = render(img, spec);

        if let Err(e) = self.cache.store(owner, &resource.id, spec, &rendered) {
            warn!(path = %resource.path, error = %e, "could not cache preview");
        }
        Ok(rendered)
    }

    fn overwrite_cached(
        &self,
        resource: &Node,
        owner: &str,
        spec: &PreviewSpec,
        image: &DynamicImage,
    ) -> Result<(), BackendError> {
        self.cache.store(owner, &resource.id, spec, image)?;
        Ok(())
    }
}
