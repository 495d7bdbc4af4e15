//! Placement arithmetic: how big the subject becomes and where it lands.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! # Precedence
//!
//! Three constraints compete for the scale factor, resolved in this order:
//!
//! 1. **Fill ratio**: the subject's box fits inside
//!    `fill_ratio × target` on both axes, aspect ratio preserved.
//! 2. **Minimum dimension**: if that leaves the longer resized edge below
//!    `min_dimension`, the scale grows until the longer edge equals it, even
//!    if the subject then covers more than `fill_ratio` of the canvas.
//! 3. **Canvas**: no scale may push the subject past the canvas edge. If the
//!    floor would, the subject is clamped to touch the canvas instead.
//!
//! ```text
//! subject 800×600 → canvas 2000×2000, fill 0.80, min 500
//! fill scale  = min(1600/800, 1600/600) = 2.0 → 1600×1200 (≥ 500, no floor)
//! paste       = ((2000-1600)/2, (2000-1200)/2) = (200, 400)
//! ```

use serde::Serialize;

/// Where and how large the resized subject sits on the canvas.
///
/// Invariant: `paste_x + resized_width <= canvas width` and
/// `paste_y + resized_height <= canvas height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub scale: f64,
    pub paste_x: u32,
    pub paste_y: u32,
    pub resized_width: u32,
    pub resized_height: u32,
    /// The minimum-dimension floor raised the scale above the fill ratio.
    pub floor_applied: bool,
    /// The scale was limited so the subject fits the canvas.
    pub canvas_clamped: bool,
}

/// Compute the scale and offset that center a subject on the canvas.
///
/// Zero-sized subjects are treated as 1×1 so the result is always a valid,
/// contained placement.
///
/// # Examples
/// ```
/// # use product_canvas::imaging::plan;
/// let p = plan(800, 600, 2000, 2000, 0.80, 500);
/// assert_eq!((p.resized_width, p.resized_height), (1600, 1200));
/// assert_eq!((p.paste_x, p.paste_y), (200, 400));
/// ```
pub fn plan(
    subject_width: u32,
    subject_height: u32,
    target_width: u32,
    target_height: u32,
    fill_ratio: f64,
    min_dimension: u32,
) -> Placement {
    let sw = subject_width.max(1) as f64;
    let sh = subject_height.max(1) as f64;
    let tw = target_width.max(1);
    let th = target_height.max(1);

    let fill_scale = (fill_ratio * tw as f64 / sw).min(fill_ratio * th as f64 / sh);
    let canvas_scale = (tw as f64 / sw).min(th as f64 / sh);

    let mut scale = fill_scale;
    let mut floor_applied = false;
    let (fill_w, fill_h) = scaled_dimensions(sw, sh, fill_scale);
    if fill_w.max(fill_h) < min_dimension {
        scale = min_dimension as f64 / sw.max(sh);
        floor_applied = true;
    }

    let mut canvas_clamped = false;
    if scale > canvas_scale {
        scale = canvas_scale;
        canvas_clamped = true;
    }

    // NaN or non-positive fill ratios collapse to a one-pixel subject.
    if !(scale.is_finite() && scale > 0.0) {
        scale = 1.0 / sw.max(sh);
    }

    let (w, h) = scaled_dimensions(sw, sh, scale);
    let resized_width = w.min(tw);
    let resized_height = h.min(th);

    Placement {
        scale,
        paste_x: (tw - resized_width) / 2,
        paste_y: (th - resized_height) / 2,
        resized_width,
        resized_height,
        floor_applied,
        canvas_clamped,
    }
}

/// Round `(width × scale, height × scale)` to whole pixels, at least 1 each.
fn scaled_dimensions(width: f64, height: f64, scale: f64) -> (u32, u32) {
    let w = (width * scale).round().max(1.0) as u32;
    let h = (height * scale).round().max(1.0) as u32;
    (w, h)
}
