//! Canvas composition: crop → Lanczos3 resize → centered paste.
//!
//! The source image is never modified; each call allocates its own canvas.
//! Resizing happens on premultiplied alpha so colour hidden under fully
//! transparent pixels never bleeds into the subject's edge.

use super::bounds::SubjectBounds;
use super::params::OutputFormat;
use super::placement::Placement;
use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};

/// Resampling kernel used for every subject resize.
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Fill used when the canvas cannot stay transparent.
pub const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// How the empty part of the canvas is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundMode {
    Transparent,
    Solid(Rgba<u8>),
}

impl BackgroundMode {
    /// Transparent only when the background was removed *and* the output
    /// format keeps alpha; everything else gets the white default.
    pub fn for_output(remove_background: bool, format: OutputFormat) -> Self {
        if remove_background && format.supports_transparency() {
            BackgroundMode::Transparent
        } else {
            BackgroundMode::Solid(DEFAULT_BACKGROUND)
        }
    }

    fn pixel(self) -> Rgba<u8> {
        match self {
            BackgroundMode::Transparent => Rgba([0, 0, 0, 0]),
            BackgroundMode::Solid(color) => color,
        }
    }
}

/// Crop `source` to `bounds`, resize per `placement` and paste it onto a
/// fresh `canvas_width`×`canvas_height` canvas.
///
/// The subject is alpha-blended over the background, so transparent source
/// pixels show the fill colour rather than black.
pub fn compose(
    source: &RgbaImage,
    bounds: &SubjectBounds,
    placement: &Placement,
    canvas_width: u32,
    canvas_height: u32,
    background: BackgroundMode,
) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, background.pixel());

    let bounds = clamp_bounds(bounds, source.width(), source.height());
    if bounds.is_empty() {
        return canvas;
    }

    let crop = imageops::crop_imm(
        source,
        bounds.left,
        bounds.top,
        bounds.width(),
        bounds.height(),
    )
    .to_image();
    let resized = unpremultiply(&imageops::resize(
        &premultiply(&crop),
        placement.resized_width,
        placement.resized_height,
        RESAMPLE_FILTER,
    ));

    imageops::overlay(
        &mut canvas,
        &resized,
        i64::from(placement.paste_x),
        i64::from(placement.paste_y),
    );
    canvas
}

fn premultiply(image: &RgbaImage) -> Rgba32FImage {
    Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0.map(|c| f32::from(c) / 255.0);
        Rgba([r * a, g * a, b * a, a])
    })
}

fn unpremultiply(image: &Rgba32FImage) -> RgbaImage {
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        if a <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        Rgba([to_u8(r / a), to_u8(g / a), to_u8(b / a), to_u8(a)])
    })
}

fn clamp_bounds(bounds: &SubjectBounds, width: u32, height: u32) -> SubjectBounds {
    let right = bounds.right.min(width);
    let bottom = bounds.bottom.min(height);
    SubjectBounds {
        left: bounds.left.min(right),
        top: bounds.top.min(bottom),
        right,
        bottom,
    }
}
