//! Pure calculation functions for preview dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Where a resampled image lands on a fixed-size canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitPlan {
    /// Size of the resampled content.
    pub width: u32,
    pub height: u32,
    /// Top-left corner of the content on the canvas.
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Whether an image of `raw` size must be refitted to `target`.
pub fn needs_fit(raw: (u32, u32), target: (u32, u32)) -> bool {
    raw != target
}

/// Scale `raw` to touch the target on its limiting side and center it on the
/// other.
///
/// Sources at least as wide (relative to height) as the target are scaled to
/// the target width and centered vertically; taller sources are scaled to the
/// target height and centered horizontally.
///
/// # Examples
/// ```
/// # use gallery_tree::imaging::{FitPlan, plan_fit};
/// // 400x200 into 200x200: full width, letterboxed top and bottom
/// assert_eq!(
///     plan_fit((400, 200), (200, 200)),
///     FitPlan { width: 200, height: 100, offset_x: 0, offset_y: 50 }
/// );
/// ```
pub fn plan_fit(raw: (u32, u32), target: (u32, u32)) -> FitPlan {
    let (raw_w, raw_h) = (raw.0.max(1) as u64, raw.1.max(1) as u64);
    let (tgt_w, tgt_h) = target;

    if raw_w * tgt_h as u64 >= tgt_w as u64 * raw_h {
        // Wider (or same shape): width matches, height shrinks
        let height = scale(raw_h, tgt_w, raw_w).clamp(1, tgt_h.max(1));
        FitPlan {
            width: tgt_w,
            height,
            offset_x: 0,
            offset_y: centered(tgt_h, height),
        }
    } else {
        let width = scale(raw_w, tgt_h, raw_h).clamp(1, tgt_w.max(1));
        FitPlan {
            width,
            height: tgt_h,
            offset_x: centered(tgt_w, width),
            offset_y: 0,
        }
    }
}

/// `value * numerator / denominator`, rounded.
fn scale(value: u64, numerator: u32, denominator: u64) -> u32 {
    (value as f64 * numerator as f64 / denominator as f64).round() as u32
}

fn centered(outer: u32, inner: u32) -> u32 {
    (outer.abs_diff(inner) as f64 / 2.0).round() as u32
}

/// Largest size with `raw`'s aspect ratio that fits inside `bounds`.
///
/// Without `scale_up`, images already inside the bounds keep their size.
pub fn fit_within(raw: (u32, u32), bounds: (u32, u32), scale_up: bool) -> (u32, u32) {
    let (raw_w, raw_h) = (raw.0.max(1), raw.1.max(1));
    let (max_w, max_h) = bounds;

    if !scale_up && raw_w <= max_w && raw_h <= max_h {
        return (raw_w, raw_h);
    }
    let ratio = (max_w as f64 / raw_w as f64).min(max_h as f64 / raw_h as f64);
    (
        ((raw_w as f64 * ratio).round() as u32).max(1),
        ((raw_h as f64 * ratio).round() as u32).max(1),
    )
}

/// Output size for a crop-to-fill of `raw` into `target`.
///
/// With `scale_up` the target is used as is. Without it, a source smaller
/// than the target yields a proportionally smaller box of the target's shape,
/// so nothing is ever enlarged.
pub fn fill_box(raw: (u32, u32), target: (u32, u32), scale_up: bool) -> (u32, u32) {
    let (tgt_w, tgt_h) = target;
    if scale_up {
        return target;
    }
    let ratio = (raw.0 as f64 / tgt_w.max(1) as f64)
        .min(raw.1 as f64 / tgt_h.max(1) as f64)
        .min(1.0);
    (
        ((tgt_w as f64 * ratio).round() as u32).max(1),
        ((tgt_h as f64 * ratio).round() as u32).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // =========================================================================
    // plan_fit tests
    // =========================================================================

    #[test]
    fn same_shape_fills_the_canvas() {
        // 300x300 into 200x200: no letterboxing at all
        assert_eq!(
            plan_fit((300, 300), (200, 200)),
            FitPlan {
                width: 200,
                height: 200,
                offset_x: 0,
                offset_y: 0
            }
        );
    }

    #[test]
    fn landscape_is_centered_vertically() {
        assert_eq!(
            plan_fit((800, 600), (200, 200)),
            FitPlan {
                width: 200,
                height: 150,
                offset_x: 0,
                offset_y: 25
            }
        );
    }

    #[test]
    fn portrait_is_centered_horizontally() {
        assert_eq!(
            plan_fit((600, 800), (200, 200)),
            FitPlan {
                width: 150,
                height: 200,
                offset_x: 25,
                offset_y: 0
            }
        );
    }

    #[test]
    fn small_source_is_scaled_up() {
        assert_eq!(
            plan_fit((50, 100), (200, 200)),
            FitPlan {
                width: 100,
                height: 200,
                offset_x: 50,
                offset_y: 0
            }
        );
    }

    #[test]
    fn extreme_panorama_keeps_one_pixel_row() {
        let plan = plan_fit((10_000, 1), (200, 200));
        assert_eq!((plan.width, plan.height), (200, 1));
        assert_eq!(plan.offset_y, 100);
    }

    #[test]
    fn odd_margins_round() {
        // 200x199 content on 200x200 leaves one pixel; half rounds up
        let plan = plan_fit((400, 398), (200, 200));
        assert_eq!(plan.height, 199);
        assert_eq!(plan.offset_y, 1);
    }

    #[test]
    fn mismatch_is_any_difference() {
        assert!(!needs_fit((200, 200), (200, 200)));
        assert!(needs_fit((300, 300), (200, 200)));
        assert!(needs_fit((200, 150), (200, 200)));
        assert!(needs_fit((200, 250), (200, 200)));
    }

    proptest! {
        #[test]
        fn plan_stays_inside_canvas(
            rw in 1u32..5000, rh in 1u32..5000,
            tw in 1u32..1000, th in 1u32..1000,
        ) {
            let plan = plan_fit((rw, rh), (tw, th));
            prop_assert!(plan.width == tw || plan.height == th);
            prop_assert!(plan.offset_x + plan.width <= tw + 1);
            prop_assert!(plan.offset_y + plan.height <= th + 1);
            prop_assert!(plan.width >= 1 && plan.height >= 1);
        }
    }

    // =========================================================================
    // fit_within tests
    // =========================================================================

    #[test]
    fn fit_within_shrinks_landscape() {
        assert_eq!(fit_within((2000, 1500), (400, 400), false), (400, 300));
    }

    #[test]
    fn fit_within_keeps_small_images() {
        assert_eq!(fit_within((300, 100), (400, 400), false), (300, 100));
    }

    #[test]
    fn fit_within_scales_up_on_request() {
        assert_eq!(fit_within((300, 100), (600, 600), true), (600, 200));
    }

    // =========================================================================
    // fill_box tests
    // =========================================================================

    #[test]
    fn fill_box_uses_target_when_source_is_large() {
        assert_eq!(fill_box((800, 600), (200, 200), false), (200, 200));
    }

    #[test]
    fn fill_box_shrinks_target_for_small_source() {
        // 150x100 cannot fill 200x200 without enlarging: 100x100 instead
        assert_eq!(fill_box((150, 100), (200, 200), false), (100, 100));
    }

    #[test]
    fn fill_box_with_scale_up_is_target() {
        assert_eq!(fill_box((150, 100), (200, 200), true), (200, 200));
    }
}
