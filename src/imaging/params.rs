//! Parameter types for encoding.
//!
//! These describe *how the canvas is written*, not how it is built. They are
//! the interface between the [`process`](crate::process) stage and the
//! [`backend`](super::backend), so a mock backend can record exactly what
//! would have been encoded.
//!
//! ## Types
//!
//! - [`OutputFormat`]: PNG (keeps alpha) or JPEG (flattened).
//! - [`CompressLevel`]: PNG deflate effort (0–9, default 6). Clamped on construction.
//! - [`Quality`]: JPEG quality (1–100, default 90). Clamped on construction.
//! - [`EncodeParams`]: everything the encoder needs for one output file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "PNG")]
    Png,
    #[serde(alias = "JPEG", alias = "jpg", alias = "JPG")]
    Jpeg,
}

impl OutputFormat {
    /// File extension written for this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Whether the format can carry an alpha channel.
    pub fn supports_transparency(self) -> bool {
        matches!(self, OutputFormat::Png)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Png => write!(f, "PNG"),
            OutputFormat::Jpeg => write!(f, "JPEG"),
        }
    }
}

/// PNG compression effort (0 = fastest, 9 = smallest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressLevel(u8);

impl CompressLevel {
    pub fn new(value: u8) -> Self {
        Self(value.min(9))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for CompressLevel {
    fn default() -> Self {
        Self(6)
    }
}

/// Quality setting for lossy encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Parameters for writing one canvas to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    pub compress_level: CompressLevel,
    pub optimize: bool,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_level_clamps_to_nine() {
        assert_eq!(CompressLevel::new(0).value(), 0);
        assert_eq!(CompressLevel::new(6).value(), 6);
        assert_eq!(CompressLevel::new(42).value(), 9);
    }

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn format_extensions() {
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn only_png_keeps_alpha() {
        assert!(OutputFormat::Png.supports_transparency());
        assert!(!OutputFormat::Jpeg.supports_transparency());
    }

    #[test]
    fn format_parses_both_spellings() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: OutputFormat,
        }
        let upper: Wrapper = toml::from_str(r#"format = "JPEG""#).unwrap();
        let lower: Wrapper = toml::from_str(r#"format = "png""#).unwrap();
        assert_eq!(upper.format, OutputFormat::Jpeg);
        assert_eq!(lower.format, OutputFormat::Png);
    }
}
