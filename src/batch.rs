//! Batch processing: many inputs, one output directory.
//!
//! [`BatchRunner::run`] walks the inputs in order, runs the
//! [`ImageProcessor`] on each, and collects the outcomes into a
//! [`BatchResult`]. A failed item is recorded and the batch moves on.
//!
//! ## Ordering
//!
//! Outcomes are always in input order. With more than one worker, items run
//! on a dedicated [rayon](https://docs.rs/rayon) pool and each result lands in
//! the slot for its input index, so completion order never leaks into the
//! result.
//!
//! ## Progress and cancellation
//!
//! The progress callback fires once per finished item, successful or not.
//! Calls are serialized through a mutex, so the callback can be a plain
//! `FnMut`. A [`CancelFlag`] is checked before each item starts; items already
//! running finish normally and the result is marked `cancelled`.
//!
//! ## Output naming
//!
//! `<output_dir>/<stem>.<ext>`, where `ext` follows the output format. Stems
//! that collide within one batch (`shoe.jpg` and `shoe.png`) get `-2`, `-3`,
//! … in input order.

use crate::imaging::{BackgroundRemover, ImageBackend, OutputFormat};
use crate::process::{ImageProcessor, ProcessingOutcome, display_name};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Shared cancellation switch. Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Parallel workers. `1` processes on the calling thread.
    pub workers: usize,
    pub cancel: CancelFlag,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            cancel: CancelFlag::new(),
        }
    }
}

/// Progress report for one finished item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    /// Items finished so far, including this one (1-based).
    pub index: usize,
    pub total: usize,
    pub name: String,
    pub success: bool,
}

/// Aggregate result of a batch.
///
/// `total` is always the number of inputs. Unless the batch was cancelled,
/// `success + failure == total` and there is one outcome per input.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    pub cancelled: bool,
    pub outcomes: Vec<ProcessingOutcome>,
}

impl BatchResult {
    fn from_outcomes(total: usize, outcomes: Vec<ProcessingOutcome>) -> Self {
        let success = outcomes.iter().filter(|o| o.success).count();
        Self {
            total,
            success,
            failure: outcomes.len() - success,
            cancelled: outcomes.len() < total,
            outcomes,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProcessingOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.failure == 0
    }
}

/// Output path for every input, deduplicating colliding stems in input order.
pub fn output_paths(inputs: &[PathBuf], output_dir: &Path, format: OutputFormat) -> Vec<PathBuf> {
    let mut used: HashSet<String> = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "image".to_string());

            let mut candidate = stem.clone();
            let mut n = 2;
            while used.contains(&candidate) {
                candidate = format!("{stem}-{n}");
                n += 1;
            }
            used.insert(candidate.clone());
            output_dir.join(format!("{candidate}.{}", format.extension()))
        })
        .collect()
}

pub struct BatchRunner<'a, B: ImageBackend, R: BackgroundRemover> {
    processor: ImageProcessor<'a, B, R>,
    options: BatchOptions,
}

impl<'a, B: ImageBackend, R: BackgroundRemover> BatchRunner<'a, B, R> {
    pub fn new(processor: ImageProcessor<'a, B, R>, options: BatchOptions) -> Self {
        Self { processor, options }
    }

    /// Process `inputs` into `output_dir`, calling `on_progress` after each item.
    ///
    /// Only setup problems (the output directory, the thread pool) are
    /// errors; item failures are reported inside the [`BatchResult`].
    pub fn run<F>(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        on_progress: F,
    ) -> Result<BatchResult, BatchError>
    where
        F: FnMut(&BatchProgress) + Send,
    {
        std::fs::create_dir_all(output_dir).map_err(|source| BatchError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let total = inputs.len();
        let workers = self.options.workers.max(1);
        info!(
            total,
            workers,
            output_dir = %output_dir.display(),
            "batch started"
        );

        let outputs = output_paths(inputs, output_dir, self.processor.config().output_format());
        let jobs: Vec<(&PathBuf, PathBuf)> = inputs.iter().zip(outputs).collect();
        let progress = Mutex::new((0usize, on_progress));

        let slots: Vec<Option<ProcessingOutcome>> = if workers == 1 || total <= 1 {
            jobs.iter()
                .map(|(input, output)| self.process_one(input, output, total, &progress))
                .collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()?;
            pool.install(|| {
                jobs.par_iter()
                    .map(|(input, output)| self.process_one(input, output, total, &progress))
                    .collect()
            })
        };

        let result = BatchResult::from_outcomes(total, slots.into_iter().flatten().collect());
        info!(
            total = result.total,
            success = result.success,
            failure = result.failure,
            cancelled = result.cancelled,
            "batch finished"
        );
        Ok(result)
    }

    fn process_one<F>(
        &self,
        input: &Path,
        output: &Path,
        total: usize,
        progress: &Mutex<(usize, F)>,
    ) -> Option<ProcessingOutcome>
    where
        F: FnMut(&BatchProgress),
    {
        if self.options.cancel.is_cancelled() {
            return None;
        }

        let outcome = self.processor.process(input, output);
        if let Some(err) = &outcome.error {
            warn!(source = %input.display(), error = %err, "item failed");
        }

        let mut guard = progress.lock().unwrap_or_else(|p| p.into_inner());
        let (done, callback) = &mut *guard;
        *done += 1;
        callback(&BatchProgress {
            index: *done,
            total,
            name: display_name(input),
            success: outcome.success,
        });
        Some(outcome)
    }
}
