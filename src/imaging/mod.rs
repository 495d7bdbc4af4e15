//! Image processing: subject detection, placement and canvas composition.
//!
//! | Step | Module | Crate / function |
//! |---|---|---|
//! | **Decode / encode** | [`rust_backend`] | `image` codecs (PNG, JPEG, TIFF, WebP) |
//! | **Background removal** | [`edge_key`], `model` | border-seeded flood fill, or `imgly-bgremove` (feature `model`) |
//! | **Subject bounds** | [`bounds`] | alpha scan |
//! | **Scale + offset** | [`placement`] | pure arithmetic |
//! | **Canvas** | [`compositor`] | `imageops::resize` (Lanczos3) + `overlay` |
//!
//! The module is split into:
//! - **Calculations**: [`bounds`] and [`placement`] are pure functions (unit testable)
//! - **Parameters**: encoding settings ([`OutputFormat`], [`CompressLevel`], [`Quality`])
//! - **Backend**: [`ImageBackend`] + [`BackgroundRemover`] traits and their production impls
//! - **Composition**: [`compose`] turns a placement into pixels

pub mod backend;
pub mod bounds;
pub mod compositor;
pub mod edge_key;
#[cfg(feature = "model")]
pub mod model;
mod params;
pub mod placement;
pub mod remover;
pub mod rust_backend;

pub use backend::{BackendError, BackgroundRemover, Dimensions, ImageBackend};
pub use bounds::{SubjectBounds, detect};
pub use compositor::{BackgroundMode, compose};
pub use edge_key::EdgeKeyRemover;
#[cfg(feature = "model")]
pub use model::ModelRemover;
pub use params::{CompressLevel, EncodeParams, OutputFormat, Quality};
pub use placement::{Placement, plan};
pub use remover::{Remover, RemoverKind};
pub use rust_backend::{RustBackend, supported_input_extensions};
