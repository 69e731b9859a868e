//! Fileserve-Common: shared error type and small utilities.
//!
//! - **Error Handling**: the unified [`Error`] enum and [`Result`] alias
//! - **Paths**: extension based content types, file kinds and stored-path
//!   normalization
//! - **Hashing**: SHA-256 hex digests used for tokens and artifact names
//!
//! # Examples
//!
//! ```
//! use fileserve_common::paths::{content_type, is_video_file};
//! use std::path::Path;
//!
//! assert_eq!(content_type(Path::new("clip.mp4")), "video/mp4");
//! assert!(is_video_file(Path::new("/media/movie.mkv")));
//! ```

pub mod error;
pub mod hash;
pub mod paths;

pub use error::{Error, Result};
pub use hash::sha256_hex;
