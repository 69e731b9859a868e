//! ffmpeg argument policy for re-encoded artifacts.
//!
//! Every artifact is H.264 with audio copied, scaled down (never up) to
//! [`EncodeSettings::max_width`]. Progressive files get a faststart `moov`
//! atom; streams are packaged as VOD HLS.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Playlist file inside a stream directory.
pub const PLAYLIST_NAME: &str = "playlist.m3u8";

/// ffmpeg segment filename pattern inside a stream directory.
pub const SEGMENT_PATTERN: &str = "seg-%03d.ts";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub max_width: u32,
    pub crf: u8,
    pub preset: String,
    pub hls_segment_seconds: u32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            max_width: 1920,
            crf: 23,
            preset: "medium".into(),
            hls_segment_seconds: 6,
        }
    }
}

impl EncodeSettings {
    fn video_args(&self, input: &Path) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            path_arg(input),
            "-vf".into(),
            format!("scale=w='min({},iw)':h=-2", self.max_width),
            "-c:v".into(),
            "libx264".into(),
            "-crf".into(),
            self.crf.to_string(),
            "-preset".into(),
            self.preset.clone(),
            "-c:a".into(),
            "copy".into(),
        ]
    }

    /// Single progressive file at `output`, used for previews and optimized
    /// copies.
    pub fn progressive_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args = self.video_args(input);
        args.extend([
            "-movflags".into(),
            "+faststart".into(),
            "-y".into(),
            path_arg(output),
        ]);
        args
    }

    /// HLS package in `dir`: [`PLAYLIST_NAME`] plus numbered segments.
    pub fn hls_args(&self, input: &Path, dir: &Path) -> Vec<String> {
        let mut args = self.video_args(input);
        args.extend([
            "-f".into(),
            "hls".into(),
            "-hls_time".into(),
            self.hls_segment_seconds.to_string(),
            "-hls_playlist_type".into(),
            "vod".into(),
            "-hls_segment_filename".into(),
            path_arg(&dir.join(SEGMENT_PATTERN)),
            "-y".into(),
            path_arg(&dir.join(PLAYLIST_NAME)),
        ]);
        args
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(args: &[String], flag: &str) -> usize {
        args.iter().position(|a| a == flag).unwrap()
    }

    #[test]
    fn progressive_policy() {
        let args = EncodeSettings::default()
            .progressive_args(Path::new("/in/movie.mkv"), Path::new("/out/movie.mkv"));

        assert_eq!(args[position(&args, "-i") + 1], "/in/movie.mkv");
        assert_eq!(args[position(&args, "-vf") + 1], "scale=w='min(1920,iw)':h=-2");
        assert_eq!(args[position(&args, "-c:v") + 1], "libx264");
        assert_eq!(args[position(&args, "-crf") + 1], "23");
        assert_eq!(args[position(&args, "-preset") + 1], "medium");
        assert_eq!(args[position(&args, "-c:a") + 1], "copy");
        assert_eq!(args[position(&args, "-movflags") + 1], "+faststart");
        assert_eq!(args.last().unwrap(), "/out/movie.mkv");
    }

    #[test]
    fn hls_policy() {
        let args =
            EncodeSettings::default().hls_args(Path::new("/in/long.mp4"), Path::new("/streams/x"));

        assert_eq!(args[position(&args, "-f") + 1], "hls");
        assert_eq!(args[position(&args, "-hls_time") + 1], "6");
        assert_eq!(args[position(&args, "-hls_playlist_type") + 1], "vod");
        assert_eq!(
            args[position(&args, "-hls_segment_filename") + 1],
            "/streams/x/seg-%03d.ts"
        );
        assert_eq!(args.last().unwrap(), "/streams/x/playlist.m3u8");
        assert!(!args.contains(&"-movflags".to_string()));
    }

    #[test]
    fn custom_settings_flow_into_args() {
        let settings = EncodeSettings {
            max_width: 1280,
            crf: 28,
            preset: "veryfast".into(),
            hls_segment_seconds: 4,
        };
        let args = settings.hls_args(Path::new("/a.mp4"), Path::new("/s"));
        assert_eq!(args[position(&args, "-vf") + 1], "scale=w='min(1280,iw)':h=-2");
        assert_eq!(args[position(&args, "-crf") + 1], "28");
        assert_eq!(args[position(&args, "-preset") + 1], "veryfast");
        assert_eq!(args[position(&args, "-hls_time") + 1], "4");
    }
}
