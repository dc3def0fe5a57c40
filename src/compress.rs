//! Single-image compression: load, search, commit.
//!
//! [`compress_bytes`] is the storage-free core; [`compress_file`] wraps it
//! with the size short-circuit, file reading and [`commit`]. Both take the
//! backend explicitly so tests can swap in a mock.
//!
//! A file is never decoded when it already fits the budget, and is never
//! written when the request is a dry run, the search was cancelled or any
//! step before the commit failed.

use crate::cancel::CancelToken;
use crate::commit::{CommitAction, CommitError, commit};
use crate::imaging::{BackendError, ImageBackend, RustBackend, load_working_image};
use crate::search::{SearchError, SearchReport, run_search};
use crate::types::{CompressionRequest, CompressionResult, RequestError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Failed to read source: {0}")]
    Read(#[source] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(#[source] BackendError),
    #[error("Failed to encode candidate: {0}")]
    Encode(#[source] BackendError),
    #[error("Failed to write result: {0}")]
    Write(#[from] CommitError),
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),
    #[error("Cancelled")]
    Cancelled,
}

/// Coarse error class recorded in batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unreadable or not a supported image container.
    Decode,
    Encode,
    /// Destination could not be written; the original is intact.
    Write,
    InvalidRequest,
    Cancelled,
}

impl CompressError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CompressError::Read(_) | CompressError::Decode(_) => FailureKind::Decode,
            CompressError::Encode(_) => FailureKind::Encode,
            CompressError::Write(_) => FailureKind::Write,
            CompressError::InvalidRequest(_) => FailureKind::InvalidRequest,
            CompressError::Cancelled => FailureKind::Cancelled,
        }
    }
}

impl From<SearchError> for CompressError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Encode(e) => CompressError::Encode(e),
            SearchError::Cancelled => CompressError::Cancelled,
        }
    }
}

/// Result of [`compress_bytes`]: metadata plus the winning encode, if any.
#[derive(Debug, Clone)]
pub struct Compressed {
    pub result: CompressionResult,
    /// `None` when the source was skipped.
    pub bytes: Option<Vec<u8>>,
}

fn into_result(original_size: u64, report: SearchReport) -> (CompressionResult, Vec<u8>) {
    let iterations_used = report.iterations();
    let SearchReport { outcome, attempts } = report;
    let stop = outcome.stop_reason();
    let candidate = outcome.into_candidate();
    let result = CompressionResult {
        original_size,
        final_size: candidate.size(),
        iterations_used,
        was_compressed: true,
        skipped: false,
        skip_reason: None,
        final_quality: Some(candidate.quality),
        final_dimensions: Some(candidate.dimensions),
        stop: Some(stop),
        backup_path: None,
        attempts,
    };
    (result, candidate.bytes)
}

/// Compress an in-memory image. Never touches storage.
pub fn compress_bytes(
    backend: &impl ImageBackend,
    bytes: &[u8],
    request: &CompressionRequest,
    cancel: &CancelToken,
) -> Result<Compressed, CompressError> {
    request.validate()?;

    let original_size = bytes.len() as u64;
    if original_size <= request.target_bytes {
        debug!(original_size, target = request.target_bytes, "already within budget");
        return Ok(Compressed {
            result: CompressionResult::already_small(original_size),
            bytes: None,
        });
    }

    let working = load_working_image(backend, bytes).map_err(CompressError::Decode)?;
    debug!(
        width = working.rgb.width(),
        height = working.rgb.height(),
        color_model = ?working.color_model,
        "decoded source"
    );

    let report = run_search(backend, &working.rgb, request, cancel)?;
    let (result, encoded) = into_result(original_size, report);
    Ok(Compressed {
        result,
        bytes: Some(encoded),
    })
}

/// Compress the image at `path` in place according to `request`.
pub fn compress_file(
    backend: &impl ImageBackend,
    path: &Path,
    request: &CompressionRequest,
    cancel: &CancelToken,
) -> Result<CompressionResult, CompressError> {
    request.validate()?;

    let original_size = std::fs::metadata(path).map_err(CompressError::Read)?.len();
    if original_size <= request.target_bytes {
        return Ok(CompressionResult::already_small(original_size));
    }

    let source = std::fs::read(path).map_err(CompressError::Read)?;
    let Compressed { mut result, bytes } = compress_bytes(backend, &source, request, cancel)?;
    drop(source);

    let Some(encoded) = bytes else {
        return Ok(result);
    };
    if cancel.is_cancelled() {
        return Err(CompressError::Cancelled);
    }

    match commit(path, &encoded, request)? {
        CommitAction::DryRun => {}
        CommitAction::Written { backup } => result.backup_path = backup,
    }

    info!(
        path = %path.display(),
        original = result.original_size,
        final_size = result.final_size,
        quality = ?result.final_quality,
        stop = ?result.stop,
        dry_run = request.dry_run,
        "compressed"
    );
    Ok(result)
}

/// Compress `path` with the built-in backend and no cancellation.
pub fn compress_image(
    path: &Path,
    request: &CompressionRequest,
) -> Result<CompressionResult, CompressError> {
    compress_file(&RustBackend::new(), path, request, &CancelToken::new())
}
