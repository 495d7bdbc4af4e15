//! Expand command-line paths into the list of images to process.
//!
//! Files are taken as given; directories are walked recursively in file-name
//! order so the same tree always yields the same batch order. ZIP archives,
//! given directly or found in a directory, are unpacked into a temporary
//! directory that lives as long as the [`CollectedInputs`]. Anything that
//! cannot be processed is reported back as a [`SkippedInput`] rather than
//! failing the run.

use crate::imaging::supported_input_extensions;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::ZipArchive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    UnsupportedFormat,
    /// The archive itself could not be opened or unpacked.
    BadArchive(String),
    /// Archive entry whose name is absolute or climbs out with `..`.
    UnsafeArchiveEntry(String),
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "not found"),
            SkipReason::UnsupportedFormat => write!(f, "unsupported file type"),
            SkipReason::BadArchive(msg) => write!(f, "bad archive: {msg}"),
            SkipReason::UnsafeArchiveEntry(name) => {
                write!(f, "archive entry '{name}' escapes the archive")
            }
            SkipReason::Unreadable(msg) => write!(f, "unreadable: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedInput {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Images to process plus everything that was passed over.
///
/// Images unpacked from archives live under `extracted`; the directories are
/// deleted when this value is dropped, so keep it alive for the whole batch.
#[derive(Debug, Default)]
pub struct CollectedInputs {
    pub images: Vec<PathBuf>,
    pub skipped: Vec<SkippedInput>,
    pub extracted: Vec<TempDir>,
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_supported_image(path: &Path) -> bool {
    extension(path).is_some_and(|ext| supported_input_extensions().contains(&ext.as_str()))
}

pub fn is_archive(path: &Path) -> bool {
    extension(path).as_deref() == Some("zip")
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Collect image paths from files, directories and ZIP archives, preserving
/// argument order.
pub fn collect_images(paths: &[PathBuf]) -> CollectedInputs {
    let mut collected = CollectedInputs::default();

    for path in paths {
        if path.is_dir() {
            collect_dir(path, &mut collected);
        } else if path.is_file() {
            if is_supported_image(path) {
                collected.images.push(path.clone());
            } else if is_archive(path) {
                collect_archive(path, &mut collected);
            } else {
                collected.skip(path, SkipReason::UnsupportedFormat);
            }
        } else {
            collected.skip(path, SkipReason::NotFound);
        }
    }

    collected
}

fn collect_dir(dir: &Path, collected: &mut CollectedInputs) {
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let path = entry.path();
                if is_supported_image(path) {
                    collected.images.push(path.to_path_buf());
                } else if is_archive(path) {
                    collect_archive(path, collected);
                }
            }
            Ok(_) => {}
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                collected.skipped.push(SkippedInput {
                    path,
                    reason: SkipReason::Unreadable(e.to_string()),
                });
            }
        }
    }
}

/// Unpack the supported images of `archive` into a fresh temporary directory
/// and queue them in name order.
fn collect_archive(archive: &Path, collected: &mut CollectedInputs) {
    let dir = match tempfile::Builder::new().prefix("product-canvas-").tempdir() {
        Ok(dir) => dir,
        Err(e) => return collected.skip(archive, SkipReason::Unreadable(e.to_string())),
    };
    match extract_images(archive, dir.path()) {
        Ok(extraction) => {
            tracing::debug!(
                archive = %archive.display(),
                images = extraction.images.len(),
                "unpacked archive"
            );
            collected.images.extend(extraction.images);
            for name in extraction.unsafe_entries {
                collected.skip(archive, SkipReason::UnsafeArchiveEntry(name));
            }
            collected.extracted.push(dir);
        }
        Err(e) => collected.skip(archive, SkipReason::BadArchive(e.to_string())),
    }
}

#[derive(Debug, Default)]
struct Extraction {
    images: Vec<PathBuf>,
    unsafe_entries: Vec<String>,
}

fn extract_images(archive: &Path, dest: &Path) -> Result<Extraction, zip::result::ZipError> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut extraction = Extraction::default();

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let relative = match safe_entry_path(entry.name()) {
            Some(relative) => relative,
            None => {
                extraction.unsafe_entries.push(entry.name().to_string());
                continue;
            }
        };
        if !is_supported_image(&relative) || is_ignored_entry(&relative) {
            continue;
        }

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        io::copy(&mut entry, &mut File::create(&target)?)?;
        extraction.images.push(target);
    }

    extraction.images.sort();
    Ok(extraction)
}

/// Relative path for an entry name, or `None` when the name is absolute or
/// contains a `..` component.
fn safe_entry_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    // Backslashes are not separators on Unix, so `..\x` is one normal component.
    if relative.as_os_str().is_empty() || name.contains('\\') {
        return None;
    }
    Some(relative)
}

/// Dot files and macOS resource forks that ride along in archives.
fn is_ignored_entry(relative: &Path) -> bool {
    relative.components().any(|c| {
        c.as_os_str()
            .to_str()
            .is_some_and(|s| s.starts_with('.') || s == "__MACOSX")
    })
}

impl CollectedInputs {
    fn skip(&mut self, path: &Path, reason: SkipReason) {
        self.skipped.push(SkippedInput {
            path: path.to_path_buf(),
            reason,
        });
    }
}
