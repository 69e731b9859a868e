//! Web-friendly artifacts for shared videos.
//!
//! - [`artifacts`] - where each artifact lives
//! - [`flight`] - coalescing of concurrent requests for the same artifact
//! - [`transcoder`] - idempotent generation through the encoder
//! - [`orchestrator`] - share-wide batch runs

pub mod artifacts;
pub mod flight;
pub mod orchestrator;
pub mod transcoder;

pub use artifacts::{ArtifactKind, ArtifactStore};
pub use orchestrator::{BatchPolicy, BatchReport, FileOutcome, FileReport, WebifyOrchestrator};
pub use transcoder::{Generation, Transcoder};
