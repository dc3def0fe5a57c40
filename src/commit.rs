//! Persisting the winning candidate.
//!
//! Commit order for a real (non dry-run) write:
//!
//! 1. Create the destination directory if it is missing.
//! 2. Write the encoded bytes to a temporary file next to the destination.
//! 3. If a backup was requested and `<path>.bak` does not exist yet, rename
//!    the original to it. An existing backup is never replaced, so repeated
//!    runs keep the very first original.
//! 4. Atomically rename the temporary file over the destination.
//!
//! The original is only touched after the new bytes are fully on disk. The
//! temporary file is a [`tempfile::NamedTempFile`], removed on drop if any
//! step fails.

use crate::types::CompressionRequest;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

/// Appended to the full file name: `photo.jpg` → `photo.jpg.bak`.
pub const BACKUP_SUFFIX: &str = ".bak";

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to back up {path}: {source}")]
    Backup { path: PathBuf, source: io::Error },
}

/// What the committer did with the candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitAction {
    /// Dry run: storage untouched.
    DryRun,
    /// Bytes written; `backup` is set when this call created the backup.
    Written { backup: Option<PathBuf> },
}

/// Sibling path holding the pre-compression original.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Persist `bytes` at `path` according to `request.dry_run` / `request.backup`.
pub fn commit(
    path: &Path,
    bytes: &[u8],
    request: &CompressionRequest,
) -> Result<CommitAction, CommitError> {
    if request.dry_run {
        return Ok(CommitAction::DryRun);
    }

    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(|source| CommitError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let write_err = |source| CommitError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".squish-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    staged.write_all(bytes).map_err(write_err)?;
    if let Ok(meta) = fs::metadata(path) {
        staged
            .as_file()
            .set_permissions(meta.permissions())
            .map_err(write_err)?;
    }
    staged.as_file().sync_all().map_err(write_err)?;

    let backup = swap_in(staged, path, request.backup, |staged, dest| {
        staged.persist(dest).map(|_| ()).map_err(|e| e.error)
    })?;

    info!(path = %path.display(), size = bytes.len(), backup = ?backup, "wrote compressed image");
    Ok(CommitAction::Written { backup })
}

/// Back up the original if asked, then move the staged file into place.
///
/// If `persist` fails, a backup made by this call is renamed back to `path`.
fn swap_in<F>(
    staged: NamedTempFile,
    path: &Path,
    backup_requested: bool,
    persist: F,
) -> Result<Option<PathBuf>, CommitError>
where
    F: FnOnce(NamedTempFile, &Path) -> io::Result<()>,
{
    let backup = if backup_requested {
        create_backup(path)?
    } else {
        None
    };

    if let Err(source) = persist(staged, path) {
        if let Some(bak) = &backup
            && let Err(restore) = fs::rename(bak, path)
        {
            warn!(
                path = %path.display(),
                error = %restore,
                "failed to restore original from backup"
            );
        }
        return Err(CommitError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(backup)
}

/// Rename the original to its backup path unless a backup already exists.
fn create_backup(path: &Path) -> Result<Option<PathBuf>, CommitError> {
    let bak = backup_path(path);
    if bak.exists() || !path.exists() {
        return Ok(None);
    }
    fs::rename(path, &bak).map_err(|source| CommitError::Backup {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(bak))
}
