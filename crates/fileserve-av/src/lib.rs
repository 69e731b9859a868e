//! # fileserve-av
//!
//! Video probing, classification and encoding for fileserve.
//!
//! - **Command execution** ([`ToolCommand`]): async process builder with a
//!   timeout, used for every ffmpeg/ffprobe call.
//! - **Tool discovery** ([`ToolRegistry`]): finds ffmpeg and ffprobe on `PATH`
//!   or at configured locations.
//! - **Probing** ([`probe`]): parses `ffprobe -of json` output into
//!   [`MediaMetadata`].
//! - **Toolkit** ([`MediaToolkit`]): the probe/encode capability the server
//!   depends on, with [`FfmpegToolkit`] as the production implementation.
//! - **Classification** ([`MediaClassifier`]): decides whether a video needs a
//!   preview and whether it should be streamed or re-encoded.
//! - **Encode policy** ([`encode`]): ffmpeg argument lists for progressive
//!   files and HLS packages.

pub mod classify;
pub mod command;
pub mod encode;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod probe;
pub mod toolkit;
pub mod tools;

pub use classify::{MediaClassifier, WebifyMode};
pub use command::{ToolCommand, ToolOutput};
pub use encode::EncodeSettings;
pub use probe::{MediaMetadata, VideoStream};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
pub use tools::{ToolInfo, ToolPaths, ToolRegistry};
