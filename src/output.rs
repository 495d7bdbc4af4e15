//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! Canvas 1000x1000 PNG, fill 0.80, min 500px, padding 20px
//!     background: removed (transparent), auto-crop: on
//! Skipped
//!     notes.txt: unsupported file type
//! [1/3] shoe.jpg ok
//! [2/3] hat.png FAILED
//! [3/3] bag.webp ok
//!
//! Processed 3 images: 2 succeeded, 1 failed
//! Failed
//!     hat.png: Decode failed: ...
//! ```
//!
//! ## Presets
//!
//! ```text
//! ecommerce_square     2000x2000  fill 0.85  Square storefront listing
//! amazon_main          2000x2000  fill 0.85  Amazon main image (keeps ...)
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `String` or `Vec<String>`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchProgress, BatchResult};
use crate::config::ProcessingConfig;
use crate::inputs::SkippedInput;
use crate::presets::Preset;

/// Width of the zero-padded counter so progress lines align.
fn counter_width(total: usize) -> usize {
    total.max(1).to_string().len()
}

// ============================================================================
// Progress
// ============================================================================

pub fn format_progress(progress: &BatchProgress) -> String {
    let width = counter_width(progress.total);
    format!(
        "[{:0width$}/{}] {} {}",
        progress.index,
        progress.total,
        progress.name,
        if progress.success { "ok" } else { "FAILED" },
    )
}

pub fn print_progress(progress: &BatchProgress) {
    println!("{}", format_progress(progress));
}

// ============================================================================
// Run header
// ============================================================================

/// Describe the effective configuration before a batch starts.
pub fn format_config(config: &ProcessingConfig) -> Vec<String> {
    let background = if !config.remove_background() {
        "kept"
    } else if config.output_format().supports_transparency() {
        "removed (transparent)"
    } else {
        "removed (white)"
    };
    vec![
        format!(
            "Canvas {}x{} {}, fill {:.2}, min {}px, padding {}px",
            config.target_width(),
            config.target_height(),
            config.output_format(),
            config.fill_ratio(),
            config.min_dimension(),
            config.crop_padding(),
        ),
        format!(
            "    background: {}, auto-crop: {}",
            background,
            if config.auto_crop() { "on" } else { "off" }
        ),
    ]
}

pub fn print_config(config: &ProcessingConfig) {
    for line in format_config(config) {
        println!("{}", line);
    }
}

pub fn format_skipped(skipped: &[SkippedInput]) -> Vec<String> {
    if skipped.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Skipped".to_string()];
    lines.extend(
        skipped
            .iter()
            .map(|s| format!("    {}: {}", s.path.display(), s.reason)),
    );
    lines
}

pub fn print_skipped(skipped: &[SkippedInput]) {
    for line in format_skipped(skipped) {
        println!("{}", line);
    }
}

// ============================================================================
// Summary
// ============================================================================

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

pub fn format_batch_summary(result: &BatchResult) -> Vec<String> {
    let mut lines = vec![String::new()];

    if result.cancelled {
        lines.push(format!(
            "Cancelled after {} of {} image{}: {} succeeded, {} failed",
            result.outcomes.len(),
            result.total,
            plural(result.total),
            result.success,
            result.failure,
        ));
    } else {
        lines.push(format!(
            "Processed {} image{}: {} succeeded, {} failed",
            result.total,
            plural(result.total),
            result.success,
            result.failure,
        ));
    }

    let failures: Vec<String> = result
        .failures()
        .map(|o| {
            let reason = o
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();
            format!("    {}: {}", o.name(), reason)
        })
        .collect();
    if !failures.is_empty() {
        lines.push("Failed".to_string());
        lines.extend(failures);
    }
    lines
}

pub fn print_batch_summary(result: &BatchResult) {
    for line in format_batch_summary(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Presets
// ============================================================================

pub fn format_presets(presets: &[Preset]) -> Vec<String> {
    let name_width = presets.iter().map(|p| p.name.len()).max().unwrap_or(0);
    presets
        .iter()
        .map(|p| {
            let size = format!("{}x{}", p.target_width, p.target_height);
            format!(
                "{:name_width$}  {:<9}  fill {:.2}  {}",
                p.name, size, p.fill_ratio, p.description
            )
        })
        .collect()
}

pub fn print_presets(presets: &[Preset]) {
    for line in format_presets(presets) {
        println!("{}", line);
    }
}
