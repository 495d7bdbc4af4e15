//! Subject bounds detection.
//!
//! Finds the tight box around every pixel whose alpha exceeds
//! [`ALPHA_THRESHOLD`], grows it by a padding margin and clamps it to the
//! image. Opaque images (no background removal, or a JPEG source) therefore
//! always detect as the full frame.

use image::RgbaImage;
use serde::Serialize;

/// Pixels with alpha at or below this value count as background.
pub const ALPHA_THRESHOLD: u8 = 0;

/// Axis-aligned box within a source image. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubjectBounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl SubjectBounds {
    /// Bounds covering a whole `width`×`height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Detect the padded content box of `image`.
///
/// Never fails and never returns a box smaller than one content pixel: a
/// fully transparent image yields [`SubjectBounds::full`].
pub fn detect(image: &RgbaImage, padding: u32) -> SubjectBounds {
    let (width, height) = image.dimensions();

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > ALPHA_THRESHOLD {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !found {
        return SubjectBounds::full(width, height);
    }

    SubjectBounds {
        left: min_x.saturating_sub(padding),
        top: min_y.saturating_sub(padding),
        right: (max_x + 1).saturating_add(padding).min(width),
        bottom: (max_y + 1).saturating_add(padding).min(height),
    }
}
