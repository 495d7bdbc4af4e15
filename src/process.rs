//! Single-image pipeline.
//!
//! [`ImageProcessor::process`] takes one input file to one output file:
//!
//! ```text
//! decode → [remove background] → [detect bounds] → plan → compose → encode
//! ```
//!
//! The bracketed steps are skipped when `remove_background` / `auto_crop` are
//! off; without auto-crop the whole image is the subject.
//!
//! Every failure inside the pipeline becomes an [`ItemError`] on the returned
//! [`ProcessingOutcome`]. `process` itself never returns an error, which is
//! what lets the batch runner carry on past a bad file.

use crate::config::ProcessingConfig;
use crate::imaging::{
    BackgroundRemover, Dimensions, ImageBackend, Placement, SubjectBounds, compose, detect, plan,
};
use image::RgbaImage;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Why one item failed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ItemError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Background removal failed: {0}")]
    BackgroundRemoval(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Result of processing one input.
///
/// Fields describing later pipeline stages stay `None` when an earlier stage
/// failed: a decode error has no dimensions, a removal error has original
/// dimensions but no placement.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutcome {
    pub source: PathBuf,
    pub output: PathBuf,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
    pub original_dimensions: Option<Dimensions>,
    pub final_dimensions: Option<Dimensions>,
    pub bounds: Option<SubjectBounds>,
    pub placement: Option<Placement>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}

impl ProcessingOutcome {
    fn started(source: &Path, output: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            success: false,
            error: None,
            original_dimensions: None,
            final_dimensions: None,
            bounds: None,
            placement: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Display name of the input (file name, falling back to the full path).
    pub fn name(&self) -> String {
        display_name(&self.source)
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Subject bounds and placement computed for one source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub bounds: SubjectBounds,
    pub placement: Placement,
}

/// Runs the single-image pipeline against a backend and a background remover.
pub struct ImageProcessor<'a, B: ImageBackend, R: BackgroundRemover> {
    backend: &'a B,
    remover: &'a R,
    config: &'a ProcessingConfig,
}

impl<'a, B: ImageBackend, R: BackgroundRemover> ImageProcessor<'a, B, R> {
    pub fn new(backend: &'a B, remover: &'a R, config: &'a ProcessingConfig) -> Self {
        Self {
            backend,
            remover,
            config,
        }
    }

    pub fn config(&self) -> &ProcessingConfig {
        self.config
    }

    /// Process `input` into `output`. Never fails; check [`ProcessingOutcome::success`].
    pub fn process(&self, input: &Path, output: &Path) -> ProcessingOutcome {
        let started = Instant::now();
        let mut outcome = ProcessingOutcome::started(input, output);

        if let Err(e) = self.run(input, output, &mut outcome) {
            debug!(source = %input.display(), error = %e, "item failed");
            outcome.error = Some(e);
        }
        outcome.success = outcome.error.is_none();
        outcome.elapsed = started.elapsed();
        outcome
    }

    fn run(
        &self,
        input: &Path,
        output: &Path,
        outcome: &mut ProcessingOutcome,
    ) -> Result<(), ItemError> {
        let decoded = self
            .backend
            .decode(input)
            .map_err(|e| ItemError::Decode(e.to_string()))?;
        outcome.original_dimensions = Some(Dimensions {
            width: decoded.width(),
            height: decoded.height(),
        });
        debug!(
            source = %input.display(),
            width = decoded.width(),
            height = decoded.height(),
            "decoded"
        );

        let source = if self.config.remove_background() {
            let keyed = self
                .remover
                .remove_background(&decoded)
                .map_err(|e| ItemError::BackgroundRemoval(e.to_string()))?;
            debug!(source = %input.display(), "background removed");
            keyed
        } else {
            decoded.into_rgba8()
        };

        let layout = self.layout(&source);
        outcome.bounds = Some(layout.bounds);
        outcome.placement = Some(layout.placement);
        debug!(
            source = %input.display(),
            scale = layout.placement.scale,
            resized_width = layout.placement.resized_width,
            resized_height = layout.placement.resized_height,
            paste_x = layout.placement.paste_x,
            paste_y = layout.placement.paste_y,
            floor_applied = layout.placement.floor_applied,
            "planned"
        );

        let canvas = self.render(&source, &layout);
        self.backend
            .encode(&canvas, output, &self.config.encode_params())
            .map_err(|e| ItemError::Encode(e.to_string()))?;
        outcome.final_dimensions = Some(Dimensions::of(&canvas));
        debug!(output = %output.display(), "encoded");
        Ok(())
    }

    /// Bounds (or the full image without auto-crop) and the placement for them.
    pub fn layout(&self, source: &RgbaImage) -> Layout {
        let bounds = if self.config.auto_crop() {
            detect(source, self.config.crop_padding())
        } else {
            SubjectBounds::full(source.width(), source.height())
        };
        let placement = plan(
            bounds.width(),
            bounds.height(),
            self.config.target_width(),
            self.config.target_height(),
            self.config.fill_ratio(),
            self.config.min_dimension(),
        );
        Layout { bounds, placement }
    }

    /// Compose the canvas for a computed layout.
    pub fn render(&self, source: &RgbaImage, layout: &Layout) -> RgbaImage {
        compose(
            source,
            &layout.bounds,
            &layout.placement,
            self.config.target_width(),
            self.config.target_height(),
            self.config.background_mode(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingSettings;
    use crate::imaging::OutputFormat;
    use crate::imaging::backend::tests::{FailingRemover, KeyColorRemover, MockBackend, RecordedOp};
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLUE: Rgba<u8> = Rgba([20, 40, 200, 255]);

    fn white_key() -> KeyColorRemover {
        KeyColorRemover { key: WHITE }
    }

    /// 200×100 white frame with a blue product at `[50, 130) × [20, 80)`.
    fn product_photo() -> RgbaImage {
        RgbaImage::from_fn(200, 100, |x, y| {
            if (50..130).contains(&x) && (20..80).contains(&y) {
                BLUE
            } else {
                WHITE
            }
        })
    }

    fn config(f: impl FnOnce(&mut ProcessingSettings)) -> ProcessingConfig {
        let mut s = ProcessingSettings {
            target_width: 1000,
            target_height: 1000,
            crop_padding: 0,
            ..Default::default()
        };
        f(&mut s);
        ProcessingConfig::try_from(s).unwrap()
    }

    #[test]
    fn successful_item_records_everything() {
        let backend = MockBackend::new().with_image("/in/shoe.jpg", product_photo());
        let remover = white_key();
        let config = config(|_| {});
        let processor = ImageProcessor::new(&backend, &remover, &config);

        let outcome = processor.process(Path::new("/in/shoe.jpg"), Path::new("/out/shoe.png"));

        assert!(outcome.success, "{:?}", outcome.error);
        assert!(outcome.error.is_none());
        assert_eq!(
            outcome.original_dimensions,
            Some(Dimensions {
                width: 200,
                height: 100
            })
        );
        assert_eq!(
            outcome.final_dimensions,
            Some(Dimensions {
                width: 1000,
                height: 1000
            })
        );
        assert_eq!(
            outcome.bounds,
            Some(SubjectBounds {
                left: 50,
                top: 20,
                right: 130,
                bottom: 80
            })
        );
        // 80×60 subject, fill 0.8 of 1000 → scale 10 → 800×600 at (100, 200).
        let placement = outcome.placement.unwrap();
        assert_eq!((placement.resized_width, placement.resized_height), (800, 600));
        assert_eq!((placement.paste_x, placement.paste_y), (100, 200));
    }

    #[test]
    fn encodes_with_configured_params() {
        let backend = MockBackend::new().with_image("/in/a.png", product_photo());
        let remover = white_key();
        let config = config(|s| {
            s.output_format = OutputFormat::Jpeg;
            s.compress_level = 3;
            s.optimize = false;
        });
        ImageProcessor::new(&backend, &remover, &config)
            .process(Path::new("/in/a.png"), Path::new("/out/a.jpg"));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], RecordedOp::Decode("/in/a.png".into()));
        assert_eq!(
            ops[1],
            RecordedOp::Encode {
                output: "/out/a.jpg".into(),
                width: 1000,
                height: 1000,
                format: OutputFormat::Jpeg,
                compress_level: 3,
                optimize: false,
            }
        );
    }

    #[test]
    fn decode_failure_is_reported_not_raised() {
        let backend = MockBackend::new();
        let remover = white_key();
        let config = config(|_| {});
        let outcome = ImageProcessor::new(&backend, &remover, &config)
            .process(Path::new("/in/missing.jpg"), Path::new("/out/missing.png"));

        assert!(!outcome.success);
        assert!(matches!(outcome.error, Some(ItemError::Decode(_))));
        assert!(outcome.original_dimensions.is_none());
        assert!(backend.encoded_outputs().is_empty());
    }

    #[test]
    fn removal_failure_is_reported() {
        let backend = MockBackend::new().with_image("/in/a.png", product_photo());
        let config = config(|_| {});
        let outcome = ImageProcessor::new(&backend, &FailingRemover, &config)
            .process(Path::new("/in/a.png"), Path::new("/out/a.png"));

        match outcome.error {
            Some(ItemError::BackgroundRemoval(msg)) => assert!(msg.contains("model unavailable")),
            other => panic!("expected removal error, got {other:?}"),
        }
        assert!(outcome.original_dimensions.is_some());
        assert!(outcome.placement.is_none());
        assert!(backend.encoded_outputs().is_empty());
    }

    #[test]
    fn encode_failure_is_reported() {
        let backend = MockBackend::new()
            .with_image("/in/a.png", product_photo())
            .with_failing_encode("/out/a.png");
        let remover = white_key();
        let config = config(|_| {});
        let outcome = ImageProcessor::new(&backend, &remover, &config)
            .process(Path::new("/in/a.png"), Path::new("/out/a.png"));

        assert!(matches!(outcome.error, Some(ItemError::Encode(_))));
        assert!(outcome.placement.is_some());
        assert!(outcome.final_dimensions.is_none());
    }

    #[test]
    fn removal_disabled_skips_remover() {
        let backend = MockBackend::new().with_image("/in/a.png", product_photo());
        let config = config(|s| s.remove_background = false);
        // The failing remover would error if it were called.
        let outcome = ImageProcessor::new(&backend, &FailingRemover, &config)
            .process(Path::new("/in/a.png"), Path::new("/out/a.png"));

        assert!(outcome.success, "{:?}", outcome.error);
        // Opaque everywhere, so detection falls back to the full frame.
        assert_eq!(outcome.bounds, Some(SubjectBounds::full(200, 100)));
    }

    #[test]
    fn auto_crop_disabled_uses_full_image() {
        let backend = MockBackend::new().with_image("/in/a.png", product_photo());
        let remover = white_key();
        let config = config(|s| s.auto_crop = false);
        let outcome = ImageProcessor::new(&backend, &remover, &config)
            .process(Path::new("/in/a.png"), Path::new("/out/a.png"));

        assert_eq!(outcome.bounds, Some(SubjectBounds::full(200, 100)));
        // 200×100 at fill 0.8 → 800×400.
        let placement = outcome.placement.unwrap();
        assert_eq!((placement.resized_width, placement.resized_height), (800, 400));
    }

    #[test]
    fn padding_widens_detected_bounds() {
        let backend = MockBackend::new().with_image("/in/a.png", product_photo());
        let remover = white_key();
        let config = config(|s| s.crop_padding = 10);
        let outcome = ImageProcessor::new(&backend, &remover, &config)
            .process(Path::new("/in/a.png"), Path::new("/out/a.png"));

        assert_eq!(
            outcome.bounds,
            Some(SubjectBounds {
                left: 40,
                top: 10,
                right: 140,
                bottom: 90
            })
        );
    }

    #[test]
    fn transparent_canvas_for_png_with_removal() {
        let remover = white_key();
        let config = config(|_| {});
        let backend = MockBackend::new();
        let processor = ImageProcessor::new(&backend, &remover, &config);

        let source = remover
            .remove_background(&image::DynamicImage::ImageRgba8(product_photo()))
            .unwrap();
        let layout = processor.layout(&source);
        let canvas = processor.render(&source, &layout);
        assert_eq!(canvas.get_pixel(0, 0)[3], 0);
        let center = canvas.get_pixel(500, 500);
        assert_eq!(center[3], 255);
        assert!(center[2] > 150 && center[0] < 60, "{center:?}");
    }

    #[test]
    fn white_canvas_for_jpeg() {
        let remover = white_key();
        let config = config(|s| s.output_format = OutputFormat::Jpeg);
        let backend = MockBackend::new();
        let processor = ImageProcessor::new(&backend, &remover, &config);

        let source = product_photo();
        let layout = processor.layout(&source);
        let canvas = processor.render(&source, &layout);
        assert_eq!(*canvas.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn processing_twice_gives_identical_layout() {
        let backend = MockBackend::new().with_image("/in/a.png", product_photo());
        let remover = white_key();
        let config = config(|_| {});
        let processor = ImageProcessor::new(&backend, &remover, &config);

        let first = processor.process(Path::new("/in/a.png"), Path::new("/out/a.png"));
        let second = processor.process(Path::new("/in/a.png"), Path::new("/out/a.png"));
        assert_eq!(first.bounds, second.bounds);
        assert_eq!(first.placement, second.placement);
        assert_eq!(first.final_dimensions, second.final_dimensions);
    }

    #[test]
    fn outcome_serializes_error_kind() {
        let backend = MockBackend::new();
        let remover = white_key();
        let config = config(|_| {});
        let outcome = ImageProcessor::new(&backend, &remover, &config)
            .process(Path::new("/in/x.png"), Path::new("/out/x.png"));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["kind"], "decode");
        assert!(json["elapsed_ms"].is_number());
        assert_eq!(outcome.name(), "x.png");
    }
}
