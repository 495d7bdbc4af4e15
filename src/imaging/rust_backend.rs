//! Decode/encode backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with content sniffing |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (compression + filter from params) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (alpha flattened) |
//!
//! Encoding writes to a temporary file beside the output and renames it into
//! place, so a failed encode never leaves a truncated file or clobbers an
//! existing one.

use super::backend::{BackendError, ImageBackend};
use super::params::{CompressLevel, EncodeParams, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, RgbaImage};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Level 0 stores, 1–9 are deflate levels passed straight through.
fn png_compression(level: CompressLevel) -> CompressionType {
    match level.value() {
        0 => CompressionType::Uncompressed,
        n => CompressionType::Level(n),
    }
}

fn png_filter(optimize: bool) -> PngFilter {
    if optimize {
        PngFilter::Adaptive
    } else {
        PngFilter::NoFilter
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
    }

    fn encode(
        &self,
        canvas: &RgbaImage,
        output: &Path,
        params: &EncodeParams,
    ) -> Result<(), BackendError> {
        let parent = match output.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        let mut staged = tempfile::Builder::new()
            .prefix(".canvas-")
            .suffix(".part")
            .tempfile_in(parent)?;
        write_encoded(canvas, staged.as_file_mut(), params)
            .map_err(|e| BackendError::Encode(format!("{}: {}", output.display(), e)))?;
        // Dropping an unpersisted temp file deletes it.
        staged.persist(output).map_err(|e| BackendError::Io(e.error))?;
        Ok(())
    }
}

fn write_encoded(
    canvas: &RgbaImage,
    file: &mut std::fs::File,
    params: &EncodeParams,
) -> Result<(), image::ImageError> {
    let mut writer = BufWriter::new(file);
    let (width, height) = canvas.dimensions();
    match params.format {
        OutputFormat::Png => PngEncoder::new_with_quality(
            &mut writer,
            png_compression(params.compress_level),
            png_filter(params.optimize),
        )
        .write_image(canvas.as_raw(), width, height, ExtendedColorType::Rgba8)?,
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(canvas.clone()).into_rgb8();
            JpegEncoder::new_with_quality(&mut writer, params.quality.value()).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use image::Rgba;

    fn params(format: OutputFormat) -> EncodeParams {
        EncodeParams {
            format,
            compress_level: CompressLevel::new(6),
            optimize: true,
            quality: Quality::new(85),
        }
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, if x < width / 2 { 255 } else { 0 }])
        })
    }

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn png_roundtrip_keeps_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.png");
        let canvas = gradient(64, 48);

        let backend = RustBackend::new();
        backend.encode(&canvas, &path, &params(OutputFormat::Png)).unwrap();

        let decoded = backend.decode(&path).unwrap().to_rgba8();
        assert_eq!(decoded, canvas);
    }

    #[test]
    fn jpeg_output_is_flattened_rgb() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.jpg");

        let backend = RustBackend::new();
        backend
            .encode(&gradient(40, 30), &path, &params(OutputFormat::Jpeg))
            .unwrap();

        let decoded = backend.decode(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn encode_creates_missing_parent_directories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/deeper/out.png");

        RustBackend::new()
            .encode(&gradient(8, 8), &path, &params(OutputFormat::Png))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn every_compress_level_encodes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = RustBackend::new();
        for level in 0..=9u8 {
            let path = tmp.path().join(format!("level-{level}.png"));
            let p = EncodeParams {
                compress_level: CompressLevel::new(level),
                optimize: level % 2 == 0,
                ..params(OutputFormat::Png)
            };
            backend.encode(&gradient(16, 16), &path, &p).unwrap();
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }

    #[test]
    fn decode_sniffs_content_over_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let png_path = tmp.path().join("real.png");
        let backend = RustBackend::new();
        backend
            .encode(&gradient(10, 10), &png_path, &params(OutputFormat::Png))
            .unwrap();

        let misnamed = tmp.path().join("actually-png.jpg");
        std::fs::copy(&png_path, &misnamed).unwrap();
        let decoded = backend.decode(&misnamed).unwrap();
        assert_eq!(decoded.width(), 10);
    }

    #[test]
    fn decode_garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = RustBackend::new().decode(&path).unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)), "{err:?}");
    }

    #[test]
    fn decode_missing_file_is_io_error() {
        let err = RustBackend::new()
            .decode(Path::new("/nonexistent/image.jpg"))
            .unwrap_err();
        assert!(matches!(err, BackendError::Io(_)), "{err:?}");
    }

    #[test]
    fn compression_mapping() {
        assert!(matches!(
            png_compression(CompressLevel::new(0)),
            CompressionType::Uncompressed
        ));
        for level in 1..=9u8 {
            assert!(matches!(
                png_compression(CompressLevel::new(level)),
                CompressionType::Level(n) if n == level
            ));
        }
    }

    /// Deterministic pseudo-random pixels so deflate effort shows in the size.
    fn noise(width: u32, height: u32) -> RgbaImage {
        let mut state = 0x2545_f491_u32;
        RgbaImage::from_fn(width, height, |x, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [a, b, _, _] = state.to_le_bytes();
            Rgba([a & 0xf0, b & 0xf0, (x % 7) as u8 * 30, 255])
        })
    }

    #[test]
    fn distinct_compress_levels_produce_distinct_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = RustBackend::new();
        let canvas = noise(128, 128);
        let encoded = |level: u8| {
            let path = tmp.path().join(format!("level-{level}.png"));
            let p = EncodeParams {
                compress_level: CompressLevel::new(level),
                ..params(OutputFormat::Png)
            };
            backend.encode(&canvas, &path, &p).unwrap();
            std::fs::read(&path).unwrap()
        };

        let stored = encoded(0);
        let level3 = encoded(3);
        let level6 = encoded(6);
        let level9 = encoded(9);
        assert_ne!(level3, level6);
        assert!(stored.len() > level9.len());
        assert!(stored.len() >= 128 * 128 * 4);
    }

    #[test]
    fn failed_encode_keeps_previous_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.png");
        std::fs::write(&path, b"previous run").unwrap();

        let err = RustBackend::new()
            .encode(&RgbaImage::new(0, 0), &path, &params(OutputFormat::Png))
            .unwrap_err();
        assert!(matches!(err, BackendError::Encode(_)), "{err:?}");

        assert_eq!(std::fs::read(&path).unwrap(), b"previous run");
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("out.png")]);
    }

    #[test]
    fn failed_encode_leaves_no_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("fresh.png");
        let result =
            RustBackend::new().encode(&RgbaImage::new(0, 0), &path, &params(OutputFormat::Png));
        assert!(result.is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
