//! Shared test utilities for the gallery test suite.
//!
//! Provides tree builders for [`MemoryStorage`], tiny encoded images, and
//! extractors that turn results into plain path lists for assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut storage = MemoryStorage::new();
//! jpegs(&mut storage, "Travel/Japan", 3);   // 001.jpg, 002.jpg, 003.jpg
//! storage.add_file("Travel/.nomedia", "");
//!
//! let result = discoverer.discover(&storage.node_at("Travel").unwrap()).unwrap();
//! assert_eq!(file_paths(&result), vec!["Travel/Japan/001.jpg"]);
//! ```

use crate::discovery::DiscoveryResult;
use crate::gallery::ListResponse;
use crate::storage::MemoryStorage;
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Tree builders
// =========================================================================

/// Add `count` JPEG entries named `001.jpg`, `002.jpg`, … under `dir`.
///
/// The entries hold no image data; use [`encoded_jpeg`] when a test decodes.
pub fn jpegs(storage: &mut MemoryStorage, dir: &str, count: usize) {
    storage.add_dir(dir);
    for i in 1..=count {
        storage.add_file(&format!("{dir}/{i:03}.jpg"), Vec::<u8>::new());
    }
}

// =========================================================================
// Encoded images
// =========================================================================

/// A gradient JPEG of the given size.
pub fn encoded_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut bytes, ImageFormat::Jpeg)
        .unwrap();
    bytes.into_inner()
}

/// A half-transparent PNG of the given size.
pub fn encoded_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, image::Rgba([0, 128, 255, 128]));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

// =========================================================================
// Extractors
// =========================================================================

/// Paths of discovered files, in discovery order.
pub fn file_paths(result: &DiscoveryResult) -> Vec<&str> {
    result.files.iter().map(|f| f.path.as_str()).collect()
}

/// Paths of visited albums, in discovery order.
pub fn album_paths(result: &DiscoveryResult) -> Vec<&str> {
    result.albums.iter().map(|a| a.path.as_str()).collect()
}

/// Paths of the files in a listing.
pub fn file_names(response: &ListResponse) -> Vec<&str> {
    response.files.iter().map(|f| f.path.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    #[test]
    fn jpegs_are_numbered() {
        let mut storage = MemoryStorage::new();
        jpegs(&mut storage, "a", 2);
        assert!(storage.node_at("a/001.jpg").is_ok());
        assert!(storage.node_at("a/002.jpg").is_ok());
        assert!(storage.node_at("a/003.jpg").is_err());
    }

    #[test]
    fn encoded_images_decode() {
        let jpeg = image::load_from_memory(&encoded_jpeg(30, 20)).unwrap();
        assert_eq!((jpeg.width(), jpeg.height()), (30, 20));
        let png = image::load_from_memory(&encoded_png(5, 6)).unwrap();
        assert!(png.color().has_alpha());
    }
}
