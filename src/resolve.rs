//! Stored path → real file resolution.
//!
//! Symlinks are followed to their final target. Missing files, broken links
//! and unreadable components all surface as the same `NotFound`, which names
//! no part of the stored path. Callers that have a public reference attach it
//! with [`for_reference`].

use std::path::{Path, PathBuf};

use fileserve_common::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub real_path: PathBuf,
    pub is_regular_file: bool,
}

fn not_found() -> Error {
    Error::not_found("file", "unresolved")
}

/// Re-key a resolution failure to the public reference of the file.
pub fn for_reference(err: Error, reference: &str) -> Error {
    match err {
        Error::NotFound { .. } => Error::not_found("file", reference),
        other => other,
    }
}

pub async fn resolve(stored: impl AsRef<Path>) -> Result<ResolvedFile> {
    let stored = stored.as_ref();

    let real_path = tokio::fs::canonicalize(stored).await.map_err(|e| {
        tracing::debug!("Cannot resolve {:?}: {}", stored, e);
        not_found()
    })?;
    let metadata = tokio::fs::metadata(&real_path).await.map_err(|e| {
        tracing::debug!("Cannot stat {:?}: {}", real_path, e);
        not_found()
    })?;

    Ok(ResolvedFile {
        real_path,
        is_regular_file: metadata.is_file(),
    })
}

/// Resolve and require a regular file; directories and special files are
/// `NotFound`.
pub async fn resolve_regular_file(stored: impl AsRef<Path>) -> Result<PathBuf> {
    let stored = stored.as_ref();
    let resolved = resolve(stored).await?;
    if !resolved.is_regular_file {
        tracing::debug!("Not a regular file: {:?}", resolved.real_path);
        return Err(not_found());
    }
    Ok(resolved.real_path)
}
