//! Border-seeded colour keying.
//!
//! Product shots are overwhelmingly taken against a plain sweep, so the
//! background is whatever colour dominates the image border. Pixels close to
//! one of those colours *and* connected to the border are keyed out; matching
//! colours enclosed by the subject (a white label on a red box) survive.
//!
//! The result is deterministic for a given image and settings, which is what
//! the batch pipeline needs from its remover.

use super::backend::{BackendError, BackgroundRemover};
use image::{DynamicImage, Rgba, RgbaImage};
use std::collections::{HashMap, VecDeque};

/// Keys out border-connected background colours.
#[derive(Debug, Clone, Copy)]
pub struct EdgeKeyRemover {
    /// Maximum summed RGB distance from a background colour.
    pub tolerance: u16,
    /// Number of dominant border colours treated as background.
    pub max_colors: usize,
    /// Border band (pixels) sampled for background colours.
    pub sample_width: u32,
}

impl Default for EdgeKeyRemover {
    fn default() -> Self {
        Self {
            tolerance: 48,
            max_colors: 3,
            sample_width: 2,
        }
    }
}

impl BackgroundRemover for EdgeKeyRemover {
    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage, BackendError> {
        let mut rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Ok(rgba);
        }

        let palette = self.background_palette(&rgba);
        if palette.is_empty() {
            return Ok(rgba);
        }

        let mask = self.flood_from_border(&rgba, &palette);
        for (i, pixel) in rgba.pixels_mut().enumerate() {
            if mask[i] {
                pixel[3] = 0;
            }
        }
        Ok(rgba)
    }
}

impl EdgeKeyRemover {
    /// Most common (quantized) opaque colours in the border band.
    fn background_palette(&self, img: &RgbaImage) -> Vec<[u8; 3]> {
        let (width, height) = img.dimensions();
        let band = self.sample_width.max(1);

        let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
        for (x, y, pixel) in img.enumerate_pixels() {
            let on_border = x < band
                || y < band
                || x.saturating_add(band) >= width
                || y.saturating_add(band) >= height;
            if on_border && pixel[3] > 0 {
                let rounded = [pixel[0] / 16 * 16, pixel[1] / 16 * 16, pixel[2] / 16 * 16];
                *counts.entry(rounded).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<([u8; 3], usize)> = counts.into_iter().collect();
        // Ties broken by colour so the palette never depends on hash order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(self.max_colors)
            .map(|(color, _)| color)
            .collect()
    }

    fn is_background(&self, pixel: &Rgba<u8>, palette: &[[u8; 3]]) -> bool {
        if pixel[3] == 0 {
            return true;
        }
        // Quantized palette entries sit at the bucket floor; measure against
        // the bucket centre.
        palette.iter().any(|c| {
            let d: u16 = (0..3)
                .map(|i| (i16::from(pixel[i]) - (i16::from(c[i]) + 8)).unsigned_abs())
                .sum();
            d <= self.tolerance
        })
    }

    /// 4-connected flood fill seeded from every background pixel on the edge.
    fn flood_from_border(&self, img: &RgbaImage, palette: &[[u8; 3]]) -> Vec<bool> {
        let (width, height) = img.dimensions();
        let index = |x: u32, y: u32| (y as usize) * (width as usize) + x as usize;

        let mut flooded = vec![false; width as usize * height as usize];
        let mut queue = VecDeque::new();

        let seed = |x: u32, y: u32, flooded: &mut [bool], queue: &mut VecDeque<(u32, u32)>| {
            let i = index(x, y);
            if !flooded[i] && self.is_background(img.get_pixel(x, y), palette) {
                flooded[i] = true;
                queue.push_back((x, y));
            }
        };

        for x in 0..width {
            seed(x, 0, &mut flooded, &mut queue);
            seed(x, height - 1, &mut flooded, &mut queue);
        }
        for y in 0..height {
            seed(0, y, &mut flooded, &mut queue);
            seed(width - 1, y, &mut flooded, &mut queue);
        }

        while let Some((x, y)) = queue.pop_front() {
            if x > 0 {
                seed(x - 1, y, &mut flooded, &mut queue);
            }
            if x + 1 < width {
                seed(x + 1, y, &mut flooded, &mut queue);
            }
            if y > 0 {
                seed(x, y - 1, &mut flooded, &mut queue);
            }
            if y + 1 < height {
                seed(x, y + 1, &mut flooded, &mut queue);
            }
        }

        flooded
    }
}
