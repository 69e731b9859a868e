//! In-process [`MediaToolkit`] double.
//!
//! Probes answer from metadata registered per file name. Encodes are recorded
//! and materialize their output: a small file for progressive targets, a
//! playlist plus one segment for HLS targets.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fileserve_common::{Error, Result};
use parking_lot::Mutex;

use crate::encode::PLAYLIST_NAME;
use crate::probe::{MediaMetadata, VideoStream};
use crate::toolkit::MediaToolkit;

/// Contents written for progressive outputs.
pub const FAKE_VIDEO_BYTES: &[u8] = b"fake encoded video";

/// Metadata for a single-stream H.264 video.
pub fn video_metadata(width: u32, stream_bit_rate: u64, duration: f64, bit_rate: u64) -> MediaMetadata {
    MediaMetadata {
        duration: Some(duration),
        bit_rate: Some(bit_rate),
        video: Some(VideoStream {
            codec: Some("h264".into()),
            width: Some(width),
            height: Some(width * 9 / 16),
            bit_rate: Some(stream_bit_rate),
        }),
    }
}

#[derive(Default)]
pub struct FakeToolkit {
    metadata: Mutex<HashMap<String, MediaMetadata>>,
    encodes: Mutex<Vec<Vec<String>>>,
    probes: AtomicUsize,
    fail_encodes: AtomicBool,
    encode_delay: Mutex<Duration>,
}

impl FakeToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(self, file_name: &str, meta: MediaMetadata) -> Self {
        self.set_metadata(file_name, meta);
        self
    }

    pub fn set_metadata(&self, file_name: &str, meta: MediaMetadata) {
        self.metadata.lock().insert(file_name.to_string(), meta);
    }

    /// Make every following encode write partial output and then fail.
    pub fn fail_encodes(&self, fail: bool) {
        self.fail_encodes.store(fail, Ordering::SeqCst);
    }

    pub fn set_encode_delay(&self, delay: Duration) {
        *self.encode_delay.lock() = delay;
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn encode_count(&self) -> usize {
        self.encodes.lock().len()
    }

    /// Argument lists of every encode so far.
    pub fn encodes(&self) -> Vec<Vec<String>> {
        self.encodes.lock().clone()
    }
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn probe(&self, path: &Path) -> Result<MediaMetadata> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.metadata
            .lock()
            .get(&name)
            .cloned()
            .ok_or_else(|| Error::ProbeFailed(format!("no metadata for {name}")))
    }

    async fn encode(&self, args: &[String]) -> Result<()> {
        self.encodes.lock().push(args.to_vec());
        let delay = *self.encode_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let output = args
            .last()
            .map(Path::new)
            .ok_or_else(|| Error::tool("ffmpeg", "no output argument"))?;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if self.fail_encodes.load(Ordering::SeqCst) {
            tokio::fs::write(output, b"partial").await?;
            return Err(Error::tool("ffmpeg", "simulated encoder failure"));
        }

        if output.file_name().is_some_and(|n| n == PLAYLIST_NAME) {
            tokio::fs::write(
                output,
                "#EXTM3U\n#EXT-X-PLAYLIST-TYPE:VOD\n#EXTINF:6.0,\nseg-000.ts\n#EXT-X-ENDLIST\n",
            )
            .await?;
            if let Some(dir) = output.parent() {
                tokio::fs::write(dir.join("seg-000.ts"), FAKE_VIDEO_BYTES).await?;
            }
        } else {
            tokio::fs::write(output, FAKE_VIDEO_BYTES).await?;
        }
        Ok(())
    }
}
