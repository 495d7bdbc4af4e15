//! Choosing the production background remover.
//!
//! | Kind | Implementation | Availability |
//! |---|---|---|
//! | `edge_key` | [`EdgeKeyRemover`]: border-seeded colour key | always |
//! | `model` | `ModelRemover`: imgly segmentation model | `model` cargo feature |
//!
//! [`Remover`] dispatches to whichever was selected, so the processor stays
//! generic over a single concrete type.

use super::backend::{BackendError, BackgroundRemover};
use super::edge_key::EdgeKeyRemover;
#[cfg(feature = "model")]
use super::model::ModelRemover;
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which background remover a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoverKind {
    #[default]
    #[serde(alias = "edge-key")]
    EdgeKey,
    Model,
}

impl RemoverKind {
    /// Whether this build can construct the remover.
    pub fn is_available(self) -> bool {
        match self {
            RemoverKind::EdgeKey => true,
            RemoverKind::Model => cfg!(feature = "model"),
        }
    }
}

impl fmt::Display for RemoverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoverKind::EdgeKey => write!(f, "edge key"),
            RemoverKind::Model => write!(f, "model"),
        }
    }
}

/// The remover selected for a run.
pub enum Remover {
    EdgeKey(EdgeKeyRemover),
    #[cfg(feature = "model")]
    Model(ModelRemover),
}

impl Remover {
    /// Build the remover for `kind`. `model` names a cached model id or a
    /// model directory and is ignored by the colour key.
    pub fn build(kind: RemoverKind, model: Option<&str>) -> Result<Self, BackendError> {
        match kind {
            RemoverKind::EdgeKey => Ok(Remover::EdgeKey(EdgeKeyRemover::default())),
            #[cfg(feature = "model")]
            RemoverKind::Model => Ok(Remover::Model(ModelRemover::new(model)?)),
            #[cfg(not(feature = "model"))]
            RemoverKind::Model => {
                let _ = model;
                Err(BackendError::Unavailable(
                    "the model remover needs a build with the `model` feature".to_string(),
                ))
            }
        }
    }
}

impl BackgroundRemover for Remover {
    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage, BackendError> {
        match self {
            Remover::EdgeKey(remover) => remover.remove_background(image),
            #[cfg(feature = "model")]
            Remover::Model(remover) => remover.remove_background(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn kind_parses_both_spellings() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: RemoverKind,
        }
        let parse = |s: &str| toml::from_str::<Wrapper>(&format!("kind = \"{s}\"")).map(|w| w.kind);
        assert_eq!(parse("edge_key").unwrap(), RemoverKind::EdgeKey);
        assert_eq!(parse("edge-key").unwrap(), RemoverKind::EdgeKey);
        assert_eq!(parse("model").unwrap(), RemoverKind::Model);
        assert!(parse("magic").is_err());
    }

    #[test]
    fn edge_key_is_default_and_always_available() {
        assert_eq!(RemoverKind::default(), RemoverKind::EdgeKey);
        assert!(RemoverKind::EdgeKey.is_available());
        assert_eq!(
            RemoverKind::Model.is_available(),
            cfg!(feature = "model")
        );
    }

    #[test]
    fn edge_key_remover_dispatches() {
        let remover = Remover::build(RemoverKind::EdgeKey, Some("ignored")).unwrap();
        let img = RgbaImage::from_fn(20, 20, |x, y| {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                Rgba([200, 20, 20, 255])
            } else {
                Rgba([250, 250, 250, 255])
            }
        });
        let out = remover
            .remove_background(&DynamicImage::ImageRgba8(img))
            .unwrap();
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(10, 10)[3], 255);
    }

    #[cfg(not(feature = "model"))]
    #[test]
    fn model_without_feature_is_unavailable() {
        let err = Remover::build(RemoverKind::Model, None).err().unwrap();
        assert!(matches!(err, BackendError::Unavailable(_)), "{err:?}");
        assert!(err.to_string().contains("`model` feature"));
    }
}
