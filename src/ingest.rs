//! Acceptance of picked and dropped batches.
//!
//! A batch is all or nothing: if any file is not acceptable the whole batch
//! is rejected with [`Error::RejectedInput`] and the queue is not touched.
//! Picked files are checked by extension, dropped files by declared MIME
//! type (falling back to the extension when none was declared).

use std::path::{Path, PathBuf};

use tunesmith_common::paths::{is_accepted_file, is_accepted_mime, mime_for_path};
use tunesmith_common::{Error, RecordId, Result};

use crate::queue::{FileQueue, SourceFile};

/// Check a dropped batch by MIME type.
pub fn validate_drop(files: &[SourceFile]) -> Result<()> {
    reject_unless(files, |file| match file.mime.as_deref() {
        Some(mime) => is_accepted_mime(mime),
        None => mime_for_path(Path::new(&file.name)).is_some(),
    })
}

/// Check a picked batch by file extension.
pub fn validate_picked(files: &[SourceFile]) -> Result<()> {
    reject_unless(files, |file| is_accepted_file(Path::new(&file.name)))
}

fn reject_unless(files: &[SourceFile], accepted: impl Fn(&SourceFile) -> bool) -> Result<()> {
    let rejected: Vec<String> = files
        .iter()
        .filter(|f| !accepted(*f))
        .map(|f| f.name.clone())
        .collect();

    if rejected.is_empty() {
        Ok(())
    } else {
        tracing::warn!("Rejected batch of {} files: {}", files.len(), rejected.join(", "));
        Err(Error::RejectedInput { files: rejected })
    }
}

/// Validate a dropped batch and queue it.
pub fn accept_drop(queue: &FileQueue, files: Vec<SourceFile>) -> Result<Vec<RecordId>> {
    validate_drop(&files)?;
    Ok(queue.ingest(files))
}

/// Validate a picked batch and queue it.
pub fn accept_picked(queue: &FileQueue, files: Vec<SourceFile>) -> Result<Vec<RecordId>> {
    validate_picked(&files)?;
    Ok(queue.ingest(files))
}

/// Read files from disk for a picked batch.
///
/// Extensions are checked before anything is read, so a rejected batch does
/// no I/O.
pub async fn load_paths(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let rejected: Vec<String> = paths
        .iter()
        .filter(|p| !is_accepted_file(p))
        .map(|p| p.display().to_string())
        .collect();
    if !rejected.is_empty() {
        return Err(Error::RejectedInput { files: rejected });
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = SourceFile::from_path(path).await.map_err(|e| match e {
            Error::Io(io) => Error::Io(std::io::Error::new(
                io.kind(),
                format!("{}: {}", path.display(), io),
            )),
            other => other,
        })?;
        files.push(file);
    }
    Ok(files)
}
