//! # Product Canvas
//!
//! Normalizes product photographs onto fixed-size canvases for storefronts
//! and social platforms: background keyed out, subject cropped, scaled to a
//! fill ratio and centered, then re-encoded as PNG or JPEG.
//!
//! # Pipeline
//!
//! ```text
//! input → decode → remove background → detect bounds → plan → compose → encode → output
//! ```
//!
//! Each image goes through [`process::ImageProcessor`]; a batch of them goes
//! through [`batch::BatchRunner`], which keeps input order, isolates per-item
//! failures and reports progress.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Bounds detection, placement arithmetic, composition, codecs and background removal |
//! | [`process`] | One image end to end, producing a [`process::ProcessingOutcome`] |
//! | [`batch`] | Ordered batches with progress, cancellation and bounded parallelism |
//! | [`config`] | `config.toml` loading, layering and validation into [`config::ProcessingConfig`] |
//! | [`presets`] | Named canvas presets (storefronts, social feeds, thumbnails) |
//! | [`inputs`] | Expands files, directories and ZIP archives into the list of images to process |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Minimum Dimension Beats Fill Ratio
//!
//! When `fill_ratio` would leave the subject's longer edge below
//! `min_dimension`, the subject is scaled up to the floor even though it then
//! covers more of the canvas than requested. The canvas itself is the only
//! hard limit. See [`imaging::placement`].
//!
//! ## Validate Once, Up Front
//!
//! Settings are merged from defaults, a preset, a config file and CLI flags,
//! then validated in one place. A bad value rejects the whole batch before any
//! file is read; per-item code can assume a valid [`config::ProcessingConfig`].
//!
//! ## Failures Are Data
//!
//! Decode, background-removal and encode failures are recorded on the item's
//! outcome. Only setup problems (an unusable output directory) abort a batch.
//!
//! ## Collaborators Behind Traits
//!
//! Decoding/encoding ([`imaging::ImageBackend`]) and background removal
//! ([`imaging::BackgroundRemover`]) are traits. Production uses the `image`
//! crate and a deterministic border colour key, or an `imgly-bgremove`
//! segmentation model when built with the `model` feature; tests swap in an
//! in-memory mock that records every call.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod inputs;
pub mod output;
pub mod presets;
pub mod process;
