//! Parameter types for preview operations.
//!
//! These structs describe *what* to render, not *how*. They sit between the
//! gallery (which decides what a request needs) and the
//! [`backend`](super::backend) (which does the pixel work), so a mock
//! generator can stand in for tests.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`PreviewSpec`]: the generator request, bounding box plus scale/aspect flags.
//! - [`ThumbnailShape`]: the client-facing thumbnail request (square tile or row thumbnail).

use serde::Deserialize;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// What the generator is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewSpec {
    pub width: u32,
    pub height: u32,
    /// Allow enlarging sources smaller than the box.
    pub scale_up: bool,
    /// Fit inside the box (`true`) or crop to fill it (`false`).
    pub keep_aspect: bool,
}

impl PreviewSpec {
    /// Aspect-preserving preview bounded by `width × height`.
    pub const fn bounded(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale_up: false,
            keep_aspect: true,
        }
    }

    /// Square crop of `size × size`.
    pub const fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            scale_up: false,
            keep_aspect: false,
        }
    }
}

/// Thumbnail request shape.
///
/// Square thumbnails decorate album tiles and are always delivered at exactly
/// the configured size. Other thumbnails are bounded by a `2:1` box of the
/// same height and keep their aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ThumbnailShape {
    pub square: bool,
    /// Multiplier for high-density screens.
    pub scale: f32,
}

impl Default for ThumbnailShape {
    fn default() -> Self {
        Self {
            square: true,
            scale: 1.0,
        }
    }
}

impl ThumbnailShape {
    pub fn square() -> Self {
        Self::default()
    }

    pub fn row(scale: f32) -> Self {
        Self {
            square: false,
            scale,
        }
    }

    /// Generator request for this shape given the configured tile size.
    pub fn spec(self, square_size: u32) -> PreviewSpec {
        let scale = if self.scale.is_finite() && self.scale > 0.0 {
            self.scale.min(4.0)
        } else {
            1.0
        };
        let size = ((square_size as f32 * scale).round() as u32).max(1);
        if self.square {
            PreviewSpec::square(size)
        } else {
            PreviewSpec::bounded(size * 2, size)
        }
    }
}
