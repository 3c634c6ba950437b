//! Preview rendering.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory_with_format` |
//! | **Bounded preview** | [`fit_within`] + Lanczos3 resize |
//! | **Square thumbnail** | `resize_to_fill`, then [`fit`] onto an exact canvas |
//! | **Encode** | PNG when transparent, JPEG otherwise |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing preview requests
//! - **Backend**: [`PreviewGenerator`] trait + [`RustGenerator`]
//! - **Fitter**: exact-size correction and cache repair
//! - **Operations**: encoding and the fallback icon

pub mod backend;
mod calculations;
pub mod fitter;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, PreviewGenerator};
pub use calculations::{FitPlan, fill_box, fit_within, needs_fit, plan_fit};
pub use fitter::{fit, repair_cache};
pub use operations::{EncodedImage, encode_preview, fallback_icon};
pub use params::{PreviewSpec, Quality, ThumbnailShape};
pub use rust_backend::{RustGenerator, supported_media_types};
