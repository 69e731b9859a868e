//! Artifact generation through the external encoder.
//!
//! Each `generate_*` call is idempotent: an existing artifact is left alone
//! and the encoder is not started. Encodes write to a hidden staging path next
//! to the target and are renamed into place once the encoder succeeds, so a
//! visible artifact is always complete. Failed encodes leave nothing behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fileserve_av::{EncodeSettings, MediaToolkit};
use fileserve_common::{Error, Result};

use super::artifacts::{ArtifactKind, ArtifactStore};
use super::flight::SingleFlight;

const STAGING_PREFIX: &str = ".partial-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// The encoder produced the artifact (possibly for a concurrent caller).
    Generated,
    AlreadyPresent,
}

#[derive(Clone)]
pub struct Transcoder {
    toolkit: Arc<dyn MediaToolkit>,
    artifacts: ArtifactStore,
    settings: Arc<EncodeSettings>,
    flights: Arc<SingleFlight<Generation>>,
}

impl Transcoder {
    pub fn new(toolkit: Arc<dyn MediaToolkit>, artifacts: ArtifactStore, settings: EncodeSettings) -> Self {
        Self {
            toolkit,
            artifacts,
            settings: Arc::new(settings),
            flights: Arc::new(SingleFlight::new()),
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Size-capped progressive copy for in-browser preview.
    pub async fn generate_preview(&self, file_path: &str) -> Result<Generation> {
        self.generate(ArtifactKind::Preview, file_path).await
    }

    pub async fn generate_optimized(&self, file_path: &str) -> Result<Generation> {
        self.generate(ArtifactKind::Optimized, file_path).await
    }

    /// HLS package: playlist plus segments in the stream directory.
    pub async fn generate_stream(&self, file_path: &str) -> Result<Generation> {
        self.generate(ArtifactKind::Stream, file_path).await
    }

    pub async fn generate(&self, kind: ArtifactKind, file_path: &str) -> Result<Generation> {
        let target = self.artifacts.path_for(kind, file_path);
        let marker = self.artifacts.ready_marker(kind, file_path);
        if ArtifactStore::exists(&marker).await {
            return Ok(Generation::AlreadyPresent);
        }

        let this = self.clone();
        let source = PathBuf::from(file_path);
        // Encodes outlive the request that started them
        let task = tokio::spawn(async move {
            this.flights
                .run(target.clone(), || this.encode_into(kind, &source, &target, &marker))
                .await
        });

        task.await
            .map_err(|e| Error::Internal(format!("transcode task failed: {e}")))?
    }

    async fn encode_into(
        &self,
        kind: ArtifactKind,
        source: &Path,
        target: &Path,
        marker: &Path,
    ) -> Result<Generation> {
        // Another caller may have finished between the check and the flight
        if ArtifactStore::exists(marker).await {
            return Ok(Generation::AlreadyPresent);
        }

        let staging = staging_path(target)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        remove_artifact(&staging).await;

        let args = match kind {
            ArtifactKind::Preview | ArtifactKind::Optimized => {
                self.settings.progressive_args(source, &staging)
            }
            ArtifactKind::Stream => {
                tokio::fs::create_dir_all(&staging).await?;
                self.settings.hls_args(source, &staging)
            }
        };

        tracing::info!("Generating {} for {:?}", kind, source);
        if let Err(e) = self.toolkit.encode(&args).await {
            tracing::error!("Encoding {} for {:?} failed: {}", kind, source, e);
            remove_artifact(&staging).await;
            return Err(Error::TranscodeFailed(e.to_string()));
        }

        // A stream directory without its playlist is left over from an
        // interrupted run and would block the rename
        remove_artifact(target).await;
        if let Err(e) = tokio::fs::rename(&staging, target).await {
            remove_artifact(&staging).await;
            return Err(Error::TranscodeFailed(format!(
                "could not publish {kind}: {e}"
            )));
        }

        tracing::info!("Generated {} at {:?}", kind, target);
        Ok(Generation::Generated)
    }
}

/// Hidden sibling of `target` used while the encoder runs.
fn staging_path(target: &Path) -> Result<PathBuf> {
    let name = target
        .file_name()
        .ok_or_else(|| Error::Internal(format!("artifact path has no file name: {target:?}")))?;
    let mut staged = std::ffi::OsString::from(STAGING_PREFIX);
    staged.push(name);
    Ok(target.with_file_name(staged))
}

/// Remove a file or directory, ignoring absence.
async fn remove_artifact(path: &Path) {
    let result = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(_) => return,
    };
    if let Err(e) = result {
        tracing::warn!("Failed to remove {:?}: {}", path, e);
    }
}
