//! Deterministic locations of generated artifacts.
//!
//! Every artifact is named `sha256(file_path) + "-" + basename(file_path)` and
//! lives under one of three roots: previews, optimized copies, and HLS stream
//! directories.

use std::fmt;
use std::path::{Path, PathBuf};

use fileserve_av::encode::PLAYLIST_NAME;
use fileserve_common::paths::stored_basename;
use fileserve_common::{sha256_hex, Error, Result};

use crate::config::StorageConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Preview,
    Optimized,
    Stream,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Preview => write!(f, "preview"),
            ArtifactKind::Optimized => write!(f, "optimized video"),
            ArtifactKind::Stream => write!(f, "video stream"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    preview_root: PathBuf,
    optimized_root: PathBuf,
    stream_root: PathBuf,
}

impl ArtifactStore {
    pub fn new(preview_root: PathBuf, optimized_root: PathBuf, stream_root: PathBuf) -> Self {
        Self {
            preview_root,
            optimized_root,
            stream_root,
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(
            storage.preview_root(),
            storage.optimized_root(),
            storage.stream_root(),
        )
    }

    /// `sha256(file_path)-basename`, stable for a given stored path.
    pub fn artifact_name(file_path: &str) -> String {
        format!("{}-{}", sha256_hex(file_path), stored_basename(file_path))
    }

    pub fn path_for(&self, kind: ArtifactKind, file_path: &str) -> PathBuf {
        let root = match kind {
            ArtifactKind::Preview => &self.preview_root,
            ArtifactKind::Optimized => &self.optimized_root,
            ArtifactKind::Stream => &self.stream_root,
        };
        root.join(Self::artifact_name(file_path))
    }

    pub fn preview_path(&self, file_path: &str) -> PathBuf {
        self.path_for(ArtifactKind::Preview, file_path)
    }

    pub fn optimized_path(&self, file_path: &str) -> PathBuf {
        self.path_for(ArtifactKind::Optimized, file_path)
    }

    /// Directory holding the playlist and segments.
    pub fn stream_dir(&self, file_path: &str) -> PathBuf {
        self.path_for(ArtifactKind::Stream, file_path)
    }

    pub fn playlist_path(&self, file_path: &str) -> PathBuf {
        self.stream_dir(file_path).join(PLAYLIST_NAME)
    }

    /// A named entry (playlist or segment) of a stream directory.
    ///
    /// # Errors
    ///
    /// [`Error::Forbidden`] for names that could leave the directory.
    pub fn stream_entry(&self, file_path: &str, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(Error::Forbidden("invalid stream file name".into()));
        }
        Ok(self.stream_dir(file_path).join(name))
    }

    /// The artifact path the webify workflow targets for `kind`: the playlist
    /// for streams, the file itself otherwise.
    pub fn ready_marker(&self, kind: ArtifactKind, file_path: &str) -> PathBuf {
        match kind {
            ArtifactKind::Stream => self.playlist_path(file_path),
            other => self.path_for(other, file_path),
        }
    }

    pub async fn exists(path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
