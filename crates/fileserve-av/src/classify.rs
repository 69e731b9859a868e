//! Video classification.
//!
//! Two independent decisions are made from one probe:
//!
//! - **Preview**: a video wider than [`PREVIEW_MAX_WIDTH`] or above
//!   [`PREVIEW_MAX_BIT_RATE`] gets a size-capped preview.
//! - **Webify**: a video longer than [`STREAM_MIN_DURATION_SECS`] or above
//!   [`STREAM_MIN_BIT_RATE`] is packaged as HLS, anything else gets an
//!   optimized progressive copy.
//!
//! All comparisons are strict. Missing metadata is a [`Error::ProbeFailed`],
//! never "no conversion needed".

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use fileserve_common::paths::is_video_file;
use fileserve_common::{Error, Result};

use crate::probe::MediaMetadata;
use crate::toolkit::MediaToolkit;

pub const PREVIEW_MAX_WIDTH: u32 = 1920;
pub const PREVIEW_MAX_BIT_RATE: u64 = 10_000_000;
pub const STREAM_MIN_DURATION_SECS: f64 = 60.0;
pub const STREAM_MIN_BIT_RATE: u64 = 6_000_000;

/// How a video is made web-friendly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebifyMode {
    /// HLS playlist and segments.
    Stream,
    /// A single re-encoded progressive file.
    Optimized,
}

impl fmt::Display for WebifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebifyMode::Stream => write!(f, "stream"),
            WebifyMode::Optimized => write!(f, "optimized"),
        }
    }
}

/// Whether a probed video needs a preview.
///
/// Uses the video stream bitrate, falling back to the container bitrate when
/// the stream does not report one.
pub fn needs_preview(meta: &MediaMetadata) -> Result<bool> {
    let video = meta
        .video
        .as_ref()
        .ok_or_else(|| Error::ProbeFailed("no video stream".into()))?;
    let width = video
        .width
        .ok_or_else(|| Error::ProbeFailed("video stream has no width".into()))?;
    let bit_rate = video
        .bit_rate
        .or(meta.bit_rate)
        .ok_or_else(|| Error::ProbeFailed("no bitrate reported".into()))?;

    Ok(width > PREVIEW_MAX_WIDTH || bit_rate > PREVIEW_MAX_BIT_RATE)
}

/// Stream or optimized copy, from container duration and bitrate.
pub fn webify_mode(meta: &MediaMetadata) -> Result<WebifyMode> {
    let duration = meta
        .duration
        .ok_or_else(|| Error::ProbeFailed("no duration reported".into()))?;
    let bit_rate = meta
        .bit_rate
        .ok_or_else(|| Error::ProbeFailed("no container bitrate reported".into()))?;

    if duration > STREAM_MIN_DURATION_SECS || bit_rate > STREAM_MIN_BIT_RATE {
        Ok(WebifyMode::Stream)
    } else {
        Ok(WebifyMode::Optimized)
    }
}

/// Probes files through a [`MediaToolkit`] and applies the rules above.
#[derive(Clone)]
pub struct MediaClassifier {
    toolkit: Arc<dyn MediaToolkit>,
}

impl MediaClassifier {
    pub fn new(toolkit: Arc<dyn MediaToolkit>) -> Self {
        Self { toolkit }
    }

    /// Probe a video file.
    ///
    /// # Errors
    ///
    /// [`Error::Classification`] for non-video files, [`Error::ProbeFailed`]
    /// when the prober fails.
    pub async fn inspect(&self, path: &Path) -> Result<MediaMetadata> {
        if !is_video_file(path) {
            return Err(Error::Classification(format!(
                "not a video file: {}",
                file_label(path)
            )));
        }
        self.toolkit.probe(path).await.map_err(|e| match e {
            Error::ProbeFailed(_) => e,
            other => Error::ProbeFailed(other.to_string()),
        })
    }

    /// Non-video files never need a preview and are not probed.
    pub async fn classify_for_preview(&self, path: &Path) -> Result<bool> {
        if !is_video_file(path) {
            return Ok(false);
        }
        needs_preview(&self.inspect(path).await?)
    }

    pub async fn classify_for_webify(&self, path: &Path) -> Result<WebifyMode> {
        webify_mode(&self.inspect(path).await?)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
