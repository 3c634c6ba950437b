//! High-level preview operations.
//!
//! Encoding rendered previews into response bytes, and the icon served when
//! no preview can be produced.

use super::backend::BackendError;
use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Rgba, RgbaImage};

/// Result type for preview operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Encoded image ready to be sent to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

/// Encode a preview: PNG when it carries transparency, JPEG otherwise.
///
/// Fitted thumbnails have transparent margins, so they always come out as
/// PNG.
pub fn encode_preview(image: &DynamicImage, quality: Quality) -> Result<EncodedImage> {
    let mut bytes = Vec::new();
    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
            .write_with_encoder(PngEncoder::new(&mut bytes))
            .map_err(|e| BackendError::Encode(format!("PNG: {e}")))?;
        Ok(EncodedImage {
            bytes,
            media_type: "image/png",
        })
    } else {
        let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.value() as u8);
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::Encode(format!("JPEG: {e}")))?;
        Ok(EncodedImage {
            bytes,
            media_type: "image/jpeg",
        })
    }
}

/// Icon colours per top-level media type.
const ICON_TINTS: &[(&str, [u8; 3])] = &[
    ("image", [0x4a, 0x90, 0xd9]),
    ("video", [0xd9, 0x53, 0x4f]),
    ("audio", [0x9b, 0x59, 0xb6]),
    ("text", [0x5c, 0xb8, 0x5c]),
    ("httpd", [0xf0, 0xad, 0x4e]),
];
const DEFAULT_TINT: [u8; 3] = [0x99, 0x99, 0x99];

/// Fallback icon edge bounds; requested sizes are clamped into this range.
pub const MIN_ICON_SIZE: u32 = 8;
pub const MAX_ICON_SIZE: u32 = 1024;

fn tint_for(media_type: &str) -> [u8; 3] {
    let family = media_type.split('/').next().unwrap_or_default();
    ICON_TINTS
        .iter()
        .find(|(f, _)| *f == family)
        .map(|(_, tint)| *tint)
        .unwrap_or(DEFAULT_TINT)
}

/// Placeholder icon for a resource whose preview failed.
///
/// A page-shaped tile with a folded corner, tinted by media family, on a
/// transparent `size × size` PNG. `size` comes from the client and is
/// clamped to [`MIN_ICON_SIZE`]..=[`MAX_ICON_SIZE`].
pub fn fallback_icon(media_type: &str, size: u32) -> Result<EncodedImage> {
    let size = size.clamp(MIN_ICON_SIZE, MAX_ICON_SIZE);
    let [r, g, b] = tint_for(media_type);
    let body = Rgba([r, g, b, 255]);
    let fold = Rgba([r / 2, g / 2, b / 2, 255]);

    let margin = size / 8;
    let (left, right) = (margin, size - margin);
    let (top, bottom) = (margin / 2, size - margin / 2);
    let corner = size / 4;

    let icon = RgbaImage::from_fn(size, size, |x, y| {
        if x < left || x >= right || y < top || y >= bottom {
            return Rgba([0, 0, 0, 0]);
        }
        // distance into the top-right corner triangle
        let dx = right - 1 - x;
        let dy = y - top;
        if dx + dy < corner {
            if dx < dy { fold } else { Rgba([0, 0, 0, 0]) }
        } else {
            body
        }
    });

    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(icon)
        .write_with_encoder(PngEncoder::new(&mut bytes))
        .map_err(|e| BackendError::Encode(format!("PNG: {e}")))?;
    Ok(EncodedImage {
        bytes,
        media_type: "image/png",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    #[test]
    fn opaque_preview_is_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, image::Rgb([1, 2, 3])));
        let encoded = encode_preview(&img, Quality::default()).unwrap();
        assert_eq!(encoded.media_type, "image/jpeg");
        assert_eq!(
            image::guess_format(&encoded.bytes).unwrap(),
            ImageFormat::Jpeg
        );
        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn transparent_preview_is_png() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(10, 10));
        let encoded = encode_preview(&img, Quality::default()).unwrap();
        assert_eq!(encoded.media_type, "image/png");
        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(decoded.to_rgba8().get_pixel(5, 5)[3], 0);
    }

    #[test]
    fn fallback_icon_is_tinted_png() {
        let encoded = fallback_icon("video/mp4", 64).unwrap();
        assert_eq!(encoded.media_type, "image/png");
        let icon = image::load_from_memory(&encoded.bytes).unwrap().to_rgba8();
        assert_eq!(icon.dimensions(), (64, 64));
        assert_eq!(*icon.get_pixel(32, 40), Rgba([0xd9, 0x53, 0x4f, 255]));
        assert_eq!(icon.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn unknown_families_use_default_tint() {
        assert_eq!(tint_for("application/pdf"), DEFAULT_TINT);
        assert_eq!(tint_for("image/jpeg"), [0x4a, 0x90, 0xd9]);
        assert_eq!(tint_for("httpd/unix-directory"), [0xf0, 0xad, 0x4e]);
    }

    #[test]
    fn tiny_icon_sizes_are_bumped() {
        let encoded = fallback_icon("image/png", 0).unwrap();
        let icon = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(icon.width(), MIN_ICON_SIZE);
    }

    #[test]
    fn huge_icon_sizes_are_capped() {
        let encoded = fallback_icon("image/gif", u32::MAX).unwrap();
        let icon = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!((icon.width(), icon.height()), (MAX_ICON_SIZE, MAX_ICON_SIZE));
    }
}
