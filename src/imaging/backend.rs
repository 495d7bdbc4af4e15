//! Collaborator traits and shared types.
//!
//! The pipeline touches the outside world through two seams:
//!
//! - [`ImageBackend`]: decode a file into pixels and encode a finished
//!   canvas back to disk. Production: [`RustBackend`](super::rust_backend::RustBackend).
//! - [`BackgroundRemover`]: turn a photograph into an image whose alpha
//!   channel marks the subject. Production:
//!   [`EdgeKeyRemover`](super::edge_key::EdgeKeyRemover), or a segmentation
//!   model with the `model` feature (see [`remover`](super::remover)).
//!
//! Both are `Sync` so one instance can serve every rayon worker.

use super::params::EncodeParams;
use image::{DynamicImage, RgbaImage};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Background remover unavailable: {0}")]
    Unavailable(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Decoder/encoder for image files.
pub trait ImageBackend: Sync {
    /// Read and decode an image file.
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode `canvas` to `output`, creating parent directories as needed.
    fn encode(
        &self,
        canvas: &RgbaImage,
        output: &Path,
        params: &EncodeParams,
    ) -> Result<(), BackendError>;
}

/// Capability that separates a subject from its background.
///
/// Implementations return an RGBA image of the same size whose alpha is 0 on
/// background pixels. Failures are surfaced to the caller and never retried.
pub trait BackgroundRemover: Sync {
    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage, BackendError>;
}
