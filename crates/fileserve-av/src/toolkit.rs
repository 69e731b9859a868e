//! The probe/encode capability behind classification and transcoding.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use fileserve_common::Result;

use crate::command::ToolCommand;
use crate::probe::{parse_probe_output, probe_args, MediaMetadata};
use crate::tools::{ToolRegistry, FFMPEG, FFPROBE};

/// Probe timeout: 60 seconds.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default encode timeout: 6 hours.
pub const DEFAULT_ENCODE_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

/// Media prober and encoder.
///
/// Tests substitute an in-process double so no external binaries run.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Read the technical metadata of the file at `path`.
    async fn probe(&self, path: &Path) -> Result<MediaMetadata>;

    /// Run the encoder with a complete argument list.
    async fn encode(&self, args: &[String]) -> Result<()>;
}

/// [`MediaToolkit`] that shells out to ffprobe and ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    encode_timeout: Duration,
}

impl FfmpegToolkit {
    pub fn new(ffmpeg: PathBuf, ffprobe: PathBuf) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            encode_timeout: DEFAULT_ENCODE_TIMEOUT,
        }
    }

    /// Build from discovered tools. Missing tools fall back to their bare
    /// names and fail at spawn time.
    pub fn from_registry(registry: &ToolRegistry) -> Self {
        for name in [FFMPEG, FFPROBE] {
            if registry.require(name).is_err() {
                tracing::warn!("{} not found; media operations will fail", name);
            }
        }
        Self::new(registry.path_or_name(FFMPEG), registry.path_or_name(FFPROBE))
    }

    pub fn with_encode_timeout(mut self, timeout: Duration) -> Self {
        self.encode_timeout = timeout;
        self
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, path: &Path) -> Result<MediaMetadata> {
        let output = ToolCommand::new(self.ffprobe.clone())
            .args(probe_args(path))
            .timeout(PROBE_TIMEOUT)
            .execute()
            .await?;

        parse_probe_output(&output.stdout)
    }

    async fn encode(&self, args: &[String]) -> Result<()> {
        ToolCommand::new(self.ffmpeg.clone())
            .args(args.iter().cloned())
            .timeout(self.encode_timeout)
            .execute()
            .await?;
        Ok(())
    }
}
