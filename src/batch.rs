//! Directory-wide compression.
//!
//! Walks a directory tree, picks up every file with a supported image
//! extension and runs [`compress_file`] on it with one shared
//! [`CompressionRequest`].
//!
//! ## Failure isolation
//!
//! A file that cannot be read, decoded or written is recorded with its error
//! and the walk moves on. Only a missing root directory or an invalid request
//! fails the whole batch.
//!
//! ## Parallel processing
//!
//! Files are independent, so they are processed on a dedicated rayon pool of
//! `threads` workers. Results are collected in walk order regardless of
//! completion order; progress events arrive in completion order.
//!
//! ## Cancellation
//!
//! The [`CancelToken`] is checked before each file is started and between
//! search iterations. Files not yet started are left alone; files already
//! past their search still commit atomically.

use crate::cancel::CancelToken;
use crate::compress::{CompressError, FailureKind, compress_file};
use crate::imaging::{ImageBackend, is_supported_image};
use crate::types::{CompressionRequest, CompressionResult, RequestError};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Directory {0} does not exist")]
    MissingRoot(PathBuf),
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Error recorded against a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&CompressError> for FileError {
    fn from(err: &CompressError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome for one file of the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: CompressionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FileError>,
}

impl FileReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn is_cancelled(&self) -> bool {
        matches!(&self.error, Some(e) if e.kind == FailureKind::Cancelled)
    }
}

/// Aggregate counters over a batch.
///
/// Byte totals cover only files that were processed without error: skipped
/// (already small) files contribute their unchanged size to both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub files_found: usize,
    pub compressed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Files not started, or abandoned mid-search, because of cancellation.
    pub cancelled: usize,
    pub total_before: u64,
    pub total_after: u64,
}

impl BatchSummary {
    pub fn from_reports(files_found: usize, reports: &[FileReport]) -> Self {
        let mut summary = BatchSummary {
            files_found,
            cancelled: files_found - reports.len(),
            ..Default::default()
        };
        for report in reports {
            if report.is_cancelled() {
                summary.cancelled += 1;
                continue;
            }
            if !report.is_ok() {
                summary.failed += 1;
                continue;
            }
            if report.result.skipped {
                summary.skipped += 1;
            } else {
                summary.compressed += 1;
            }
            summary.total_before += report.result.original_size;
            summary.total_after += report.result.final_size;
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub root: PathBuf,
    pub files: Vec<FileReport>,
    pub summary: BatchSummary,
}

/// Progress events sent while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        root: PathBuf,
        file_count: usize,
        target_kb: u64,
        dry_run: bool,
        backup: bool,
    },
    FileFinished { report: FileReport },
}

/// Recursively list supported images under `root`, sorted by path.
///
/// Unreadable subdirectories are logged and skipped.
pub fn collect_images(root: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !root.is_dir() {
        return Err(BatchError::MissingRoot(root.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_supported_image(entry.path()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "skipping unreadable entry"),
        }
    }
    Ok(files)
}

fn process_one(
    backend: &impl ImageBackend,
    path: &Path,
    request: &CompressionRequest,
    cancel: &CancelToken,
) -> FileReport {
    match compress_file(backend, path, request, cancel) {
        Ok(result) => FileReport {
            path: path.to_path_buf(),
            result,
            error: None,
        },
        Err(err) => {
            if !matches!(err, CompressError::Cancelled) {
                warn!(path = %path.display(), error = %err, "failed to compress");
            }
            let original_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            FileReport {
                path: path.to_path_buf(),
                result: CompressionResult::failed(original_size),
                error: Some(FileError::from(&err)),
            }
        }
    }
}

/// Compress every supported image under `root`.
pub fn compress_tree(
    backend: &impl ImageBackend,
    root: &Path,
    request: &CompressionRequest,
    threads: usize,
    cancel: &CancelToken,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    request.validate()?;
    let files = collect_images(root)?;

    if let Some(tx) = &events {
        tx.send(BatchEvent::Started {
            root: root.to_path_buf(),
            file_count: files.len(),
            target_kb: request.target_bytes / 1024,
            dry_run: request.dry_run,
            backup: request.backup,
        })
        .ok();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()?;

    let reports: Vec<FileReport> = pool.install(|| {
        files
            .par_iter()
            .filter_map(|path| {
                if cancel.is_cancelled() {
                    return None;
                }
                let report = process_one(backend, path, request, cancel);
                if let Some(tx) = &events {
                    tx.send(BatchEvent::FileFinished {
                        report: report.clone(),
                    })
                    .ok();
                }
                Some(report)
            })
            .collect()
    });

    let summary = BatchSummary::from_reports(files.len(), &reports);
    Ok(BatchReport {
        root: root.to_path_buf(),
        files: reports,
        summary,
    })
}
