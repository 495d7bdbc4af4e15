//! Segmentation-model background removal through `imgly-bgremove`.
//!
//! The library is async; each call is driven to completion on a private
//! current-thread tokio runtime so the remover fits the synchronous
//! [`BackgroundRemover`] seam and can be shared by every batch worker.
//!
//! Models are resolved the way `imgly-bgremove` resolves them: a path to an
//! existing model directory is used as is, anything else is looked up as a
//! cached model id (see `imgly-bgremove --list-models`).

use super::backend::{BackendError, BackgroundRemover};
use image::{DynamicImage, RgbaImage};
use imgly_bgremove::{
    ExecutionProvider, ModelSource, ModelSpec, RemovalConfig, remove_background_from_image,
};
use std::path::PathBuf;
use tokio::runtime::{Builder, Runtime};

/// Background remover backed by an ONNX segmentation model.
pub struct ModelRemover {
    config: RemovalConfig,
    runtime: Runtime,
}

impl ModelRemover {
    pub fn new(model: Option<&str>) -> Result<Self, BackendError> {
        let config = RemovalConfig::builder()
            .execution_provider(ExecutionProvider::Auto)
            .output_format(imgly_bgremove::OutputFormat::Png)
            .model_spec(model_spec(model))
            .build()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { config, runtime })
    }
}

fn model_spec(model: Option<&str>) -> ModelSpec {
    match model {
        Some(name) if PathBuf::from(name).is_dir() => ModelSpec {
            source: ModelSource::External(PathBuf::from(name)),
            variant: None,
        },
        Some(name) => ModelSpec {
            source: ModelSource::Downloaded(name.to_string()),
            variant: None,
        },
        // Empty id: the first cached model.
        None => ModelSpec::default(),
    }
}

impl BackgroundRemover for ModelRemover {
    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage, BackendError> {
        let result = self
            .runtime
            .block_on(remove_background_from_image(image.clone(), &self.config))
            .map_err(|e| BackendError::ProcessingFailed(e.to_string()))?;
        Ok(result.image.to_rgba8())
    }
}
