//! Exact-size correction for generated previews.
//!
//! Generators return the best rendering they can, which is not always the
//! requested size (small sources without upscaling, cached entries from an
//! older tile size). Album tiles need exact squares, so [`fit`] places the
//! rendering on a transparent canvas of the target size and
//! [`repair_cache`] writes the corrected image back so the next request is
//! served right away.

use super::backend::PreviewGenerator;
use super::calculations::{needs_fit, plan_fit};
use super::params::PreviewSpec;
use crate::storage::Node;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use tracing::{debug, warn};

/// Fit `raw` onto a `target_w × target_h` canvas.
///
/// Images already at the target size are returned untouched. Anything else
/// is scaled to touch the canvas on its limiting side, centered on the other
/// and surrounded by transparent pixels.
pub fn fit(raw: DynamicImage, target_w: u32, target_h: u32) -> DynamicImage {
    let raw_size = (raw.width(), raw.height());
    if target_w == 0 || target_h == 0 || !needs_fit(raw_size, (target_w, target_h)) {
        return raw;
    }

    let mut canvas = RgbaImage::new(target_w, target_h);
    if raw_size.0 == 0 || raw_size.1 == 0 {
        return DynamicImage::ImageRgba8(canvas);
    }

    let plan = plan_fit(raw_size, (target_w, target_h));
    debug!(
        from = ?raw_size,
        to = ?(target_w, target_h),
        offset = ?(plan.offset_x, plan.offset_y),
        "fitting preview"
    );
    let scaled = raw
        .resize_exact(plan.width, plan.height, FilterType::Lanczos3)
        .into_rgba8();
    imageops::overlay(
        &mut canvas,
        &scaled,
        i64::from(plan.offset_x),
        i64::from(plan.offset_y),
    );
    DynamicImage::ImageRgba8(canvas)
}

/// Overwrite the generator's cached entry with a fitted image.
///
/// Best effort: a failed write is logged and otherwise ignored.
pub fn repair_cache<G: PreviewGenerator + ?Sized>(
    generator: &G,
    resource: &Node,
    owner: &str,
    spec: &PreviewSpec,
    fitted: &DynamicImage,
) {
    if let Err(e) = generator.overwrite_cached(resource, owner, spec, fitted) {
        warn!(path = %resource.path, error = %e, "could not repair preview cache");
    }
}
