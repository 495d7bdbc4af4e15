//! Processing configuration.
//!
//! Handles loading, layering and validating settings. Every run resolves one
//! [`ProcessingConfig`] before any image is touched; an invalid value rejects
//! the whole batch up front instead of failing item by item.
//!
//! ## Layers
//!
//! Later layers override earlier ones key by key:
//!
//! ```text
//! stock defaults → --preset NAME → --config FILE → CLI flags
//! ```
//!
//! Each layer is a sparse TOML table merged with [`merge_toml`], so a config
//! file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [processing]
//! target_width = 1000       # Canvas width in pixels
//! target_height = 1000      # Canvas height in pixels
//! remove_background = true  # Key out the background before cropping
//! auto_crop = true          # Crop to the subject's bounds
//! crop_padding = 20         # Margin kept around the subject (pixels)
//! fill_ratio = 0.80         # Share of the canvas the subject should cover, (0, 1]
//! min_dimension = 500       # Floor for the subject's longer edge (pixels)
//! output_format = "png"     # "png" or "jpeg"
//! compress_level = 6        # PNG compression effort (0-9)
//! optimize = true           # Adaptive PNG filtering
//! jpeg_quality = 90         # JPEG quality (1-100)
//!
//! [remover]
//! kind = "edge_key"         # "edge_key" or "model" (needs the `model` feature)
//! model = "imgly--isnet-general-onnx"  # Cached model id or model directory
//!
//! [batch]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    BackgroundMode, CompressLevel, EncodeParams, OutputFormat, Quality, RemoverKind,
};
use crate::presets;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Unknown preset '{name}'. Available: {available}")]
    UnknownPreset { name: String, available: String },
}

/// Full settings file: processing options, the background remover and batch
/// execution options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub processing: ProcessingSettings,
    pub remover: RemoverSettings,
    pub batch: BatchSettings,
}

/// Raw processing options as they appear in TOML or on the command line.
///
/// Nothing here is validated; convert with [`ProcessingConfig::try_from`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingSettings {
    pub target_width: u32,
    pub target_height: u32,
    pub remove_background: bool,
    pub auto_crop: bool,
    pub crop_padding: u32,
    pub fill_ratio: f64,
    pub min_dimension: u32,
    pub output_format: OutputFormat,
    pub compress_level: u8,
    pub optimize: bool,
    pub jpeg_quality: u8,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            target_width: 1000,
            target_height: 1000,
            remove_background: true,
            auto_crop: true,
            crop_padding: 20,
            fill_ratio: 0.80,
            min_dimension: 500,
            output_format: OutputFormat::Png,
            compress_level: 6,
            optimize: true,
            jpeg_quality: 90,
        }
    }
}

/// Which background remover runs when `remove_background` is on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoverSettings {
    pub kind: RemoverKind,
    /// Model id or directory for the `model` remover. `None` picks the
    /// first cached model.
    pub model: Option<String>,
}

/// Batch execution settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSettings {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1 (user can constrain down, not up)
pub fn effective_threads(config: &BatchSettings) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Validated, immutable processing configuration.
///
/// The only way to obtain one is through [`TryFrom<ProcessingSettings>`]
/// (or [`Default`], whose values are known to be valid), so every
/// `ProcessingConfig` in the program satisfies:
///
/// - `target_width > 0` and `target_height > 0`
/// - `0 < fill_ratio <= 1`
/// - `0 < min_dimension <= min(target_width, target_height)`
/// - `compress_level <= 9`, `1 <= jpeg_quality <= 100`
///
/// `fill_ratio × min(target) >= min_dimension` is deliberately *not*
/// required; the planner resolves that conflict in favour of the floor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingConfig {
    target_width: u32,
    target_height: u32,
    remove_background: bool,
    auto_crop: bool,
    crop_padding: u32,
    fill_ratio: f64,
    min_dimension: u32,
    output_format: OutputFormat,
    compress_level: CompressLevel,
    optimize: bool,
    jpeg_quality: Quality,
}

impl TryFrom<ProcessingSettings> for ProcessingConfig {
    type Error = ConfigError;

    fn try_from(s: ProcessingSettings) -> Result<Self, ConfigError> {
        if s.target_width == 0 || s.target_height == 0 {
            return Err(ConfigError::Validation(format!(
                "target dimensions must be positive, got {}x{}",
                s.target_width, s.target_height
            )));
        }
        if !(s.fill_ratio > 0.0 && s.fill_ratio <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "fill_ratio must be in (0, 1], got {}",
                s.fill_ratio
            )));
        }
        let shorter = s.target_width.min(s.target_height);
        if s.min_dimension == 0 || s.min_dimension > shorter {
            return Err(ConfigError::Validation(format!(
                "min_dimension must be between 1 and {shorter} (the shorter target edge), got {}",
                s.min_dimension
            )));
        }
        if s.compress_level > 9 {
            return Err(ConfigError::Validation(format!(
                "compress_level must be 0-9, got {}",
                s.compress_level
            )));
        }
        if !(1..=100).contains(&s.jpeg_quality) {
            return Err(ConfigError::Validation(format!(
                "jpeg_quality must be 1-100, got {}",
                s.jpeg_quality
            )));
        }

        Ok(Self {
            target_width: s.target_width,
            target_height: s.target_height,
            remove_background: s.remove_background,
            auto_crop: s.auto_crop,
            crop_padding: s.crop_padding,
            fill_ratio: s.fill_ratio,
            min_dimension: s.min_dimension,
            output_format: s.output_format,
            compress_level: CompressLevel::new(s.compress_level),
            optimize: s.optimize,
            jpeg_quality: Quality::new(s.jpeg_quality),
        })
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        let s = ProcessingSettings::default();
        Self {
            target_width: s.target_width,
            target_height: s.target_height,
            remove_background: s.remove_background,
            auto_crop: s.auto_crop,
            crop_padding: s.crop_padding,
            fill_ratio: s.fill_ratio,
            min_dimension: s.min_dimension,
            output_format: s.output_format,
            compress_level: CompressLevel::new(s.compress_level),
            optimize: s.optimize,
            jpeg_quality: Quality::new(s.jpeg_quality),
        }
    }
}

impl ProcessingConfig {
    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    pub fn remove_background(&self) -> bool {
        self.remove_background
    }

    pub fn auto_crop(&self) -> bool {
        self.auto_crop
    }

    pub fn crop_padding(&self) -> u32 {
        self.crop_padding
    }

    pub fn fill_ratio(&self) -> f64 {
        self.fill_ratio
    }

    pub fn min_dimension(&self) -> u32 {
        self.min_dimension
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn compress_level(&self) -> CompressLevel {
        self.compress_level
    }

    pub fn optimize(&self) -> bool {
        self.optimize
    }

    pub fn encode_params(&self) -> EncodeParams {
        EncodeParams {
            format: self.output_format,
            compress_level: self.compress_level,
            optimize: self.optimize,
            quality: self.jpeg_quality,
        }
    }

    pub fn background_mode(&self) -> BackgroundMode {
        BackgroundMode::for_output(self.remove_background, self.output_format)
    }

    /// Back to the raw form, e.g. to print the effective config as TOML.
    pub fn to_settings(&self) -> ProcessingSettings {
        ProcessingSettings {
            target_width: self.target_width,
            target_height: self.target_height,
            remove_background: self.remove_background,
            auto_crop: self.auto_crop,
            crop_padding: self.crop_padding,
            fill_ratio: self.fill_ratio,
            min_dimension: self.min_dimension,
            output_format: self.output_format,
            compress_level: self.compress_level.value(),
            optimize: self.optimize,
            jpeg_quality: self.jpeg_quality.value(),
        }
    }
}

/// A fully resolved and validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub processing: ProcessingConfig,
    pub remover: RemoverSettings,
    pub batch: BatchSettings,
}

impl ResolvedConfig {
    /// Render as a `config.toml` that reproduces this configuration.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let file = ConfigFile {
            processing: self.processing.to_settings(),
            remover: self.remover.clone(),
            batch: self.batch.clone(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ConfigFile::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(value)
}

/// Merge `overlays` onto `base` in order, then deserialize and validate once.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<ResolvedConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let file: ConfigFile = merged.try_into()?;
    if !file.remover.kind.is_available() {
        return Err(ConfigError::Validation(format!(
            "remover \"{}\" is not compiled in; rebuild with `--features model`",
            file.remover.kind
        )));
    }
    Ok(ResolvedConfig {
        processing: ProcessingConfig::try_from(file.processing)?,
        remover: file.remover,
        batch: file.batch,
    })
}

/// Resolve the configuration for one run.
///
/// Layers, lowest precedence first: stock defaults, the named preset, the
/// config file, then `overrides` (typically built from CLI flags).
pub fn load_config(
    preset: Option<&str>,
    file: Option<&Path>,
    overrides: Option<toml::Value>,
) -> Result<ResolvedConfig, ConfigError> {
    let mut layers = Vec::new();
    if let Some(name) = preset {
        layers.push(presets::get_preset(name)?.overlay());
    }
    if let Some(path) = file {
        layers.push(load_raw_config(path)?);
    }
    layers.extend(overrides);
    resolve_config(stock_defaults_value()?, layers)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Product Canvas Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Settings are layered, later layers win:
#   stock defaults -> --preset NAME -> --config FILE -> command-line flags
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Canvas and subject placement
# ---------------------------------------------------------------------------
[processing]
# Output canvas size in pixels.
target_width = 1000
target_height = 1000

# Key out the background before detecting the subject. With PNG output the
# canvas stays transparent; otherwise it is filled white.
remove_background = true

# Crop to the subject's bounding box (plus crop_padding pixels each side).
auto_crop = true
crop_padding = 20

# Share of the canvas the subject's box should cover, in (0, 1].
fill_ratio = 0.80

# Minimum length of the subject's longer edge, in pixels. Takes precedence
# over fill_ratio; must not exceed the shorter canvas edge.
min_dimension = 500

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
# "png" or "jpeg".
output_format = "png"

# PNG compression effort, 0 (fastest) to 9 (smallest).
compress_level = 6

# Adaptive PNG filtering: smaller files, slower encode.
optimize = true

# JPEG quality, 1-100.
jpeg_quality = 90

# ---------------------------------------------------------------------------
# Background remover
# ---------------------------------------------------------------------------
[remover]
# "edge_key" keys out the dominant border colours (plain studio sweeps).
# "model" runs an imgly segmentation model; needs a build with the `model`
# feature and a model downloaded with `imgly-bgremove`.
kind = "edge_key"

# Cached model id or path to a model directory. Omit to use the first
# cached model.
# model = "imgly--isnet-general-onnx"

# ---------------------------------------------------------------------------
# Batch execution
# ---------------------------------------------------------------------------
[batch]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
