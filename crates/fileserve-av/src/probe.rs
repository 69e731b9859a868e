//! ffprobe invocation and JSON parsing.
//!
//! A single call reads the container `duration`/`bit_rate` and the first video
//! stream's codec, dimensions and bitrate:
//!
//! ```text
//! ffprobe -v error -select_streams v:0
//!   -show_entries format=duration,bit_rate:stream=codec_name,width,height,bit_rate
//!   -of json <path>
//! ```

use std::path::Path;

use fileserve_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Technical metadata of a media file. Any field ffprobe did not report is
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaMetadata {
    /// Container duration in seconds.
    pub duration: Option<f64>,
    /// Container bitrate in bits per second.
    pub bit_rate: Option<u64>,
    /// The primary video stream, if the file has one.
    pub video: Option<VideoStream>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoStream {
    pub codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bit_rate: Option<u64>,
}

/// Arguments for the metadata probe of `path`.
pub fn probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-select_streams".into(),
        "v:0".into(),
        "-show_entries".into(),
        "format=duration,bit_rate:stream=codec_name,width,height,bit_rate".into(),
        "-of".into(),
        "json".into(),
        path.to_string_lossy().into_owned(),
    ]
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

// ffprobe prints numeric format fields as strings ("12.480000", "N/A")
#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    bit_rate: Option<String>,
}

/// Parse `ffprobe -of json` output.
///
/// # Errors
///
/// [`Error::ProbeFailed`] if the output is not valid ffprobe JSON or has no
/// `format` section.
pub fn parse_probe_output(json: &str) -> Result<MediaMetadata> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::ProbeFailed(format!("ffprobe JSON parse error: {e}")))?;

    let format = output
        .format
        .ok_or_else(|| Error::ProbeFailed("ffprobe reported no format section".into()))?;

    let video = output.streams.into_iter().next().map(|s| VideoStream {
        codec: s.codec_name,
        width: s.width,
        height: s.height,
        bit_rate: s.bit_rate.as_deref().and_then(parse_number),
    });

    Ok(MediaMetadata {
        duration: format.duration.as_deref().and_then(parse_seconds),
        bit_rate: format.bit_rate.as_deref().and_then(parse_number),
        video,
    })
}

fn parse_number(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

fn parse_seconds(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|d| d.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_output() {
        let json = r#"{
            "programs": [],
            "streams": [
                { "codec_name": "h264", "width": 3840, "height": 2160, "bit_rate": "24000000" }
            ],
            "format": { "duration": "95.040000", "bit_rate": "24500000" }
        }"#;

        let meta = parse_probe_output(json).unwrap();
        assert_eq!(meta.duration, Some(95.04));
        assert_eq!(meta.bit_rate, Some(24_500_000));
        assert_eq!(
            meta.video,
            Some(VideoStream {
                codec: Some("h264".into()),
                width: Some(3840),
                height: Some(2160),
                bit_rate: Some(24_000_000),
            })
        );
    }

    #[test]
    fn missing_stream_bitrate_is_none() {
        // Matroska usually reports no per-stream bitrate
        let json = r#"{
            "streams": [{ "codec_name": "hevc", "width": 1920, "height": 1080 }],
            "format": { "duration": "30.0", "bit_rate": "N/A" }
        }"#;

        let meta = parse_probe_output(json).unwrap();
        let video = meta.video.unwrap();
        assert_eq!(video.bit_rate, None);
        assert_eq!(meta.bit_rate, None);
        assert_eq!(meta.duration, Some(30.0));
    }

    #[test]
    fn no_video_stream() {
        let json = r#"{ "streams": [], "format": { "duration": "200.1" } }"#;
        let meta = parse_probe_output(json).unwrap();
        assert!(meta.video.is_none());
    }

    #[test]
    fn malformed_output_is_probe_failure() {
        assert!(matches!(
            parse_probe_output("not json"),
            Err(Error::ProbeFailed(_))
        ));
        assert!(matches!(
            parse_probe_output(r#"{"streams": []}"#),
            Err(Error::ProbeFailed(_))
        ));
    }

    #[test]
    fn probe_args_end_with_path() {
        let args = probe_args(Path::new("/srv/a b.mkv"));
        assert_eq!(args.first().map(String::as_str), Some("-v"));
        assert_eq!(args.last().map(String::as_str), Some("/srv/a b.mkv"));
        assert!(args.contains(&"v:0".to_string()));
    }
}
