//! Unified error type for fileserve.
//!
//! Every crate in the workspace funnels its failures into [`Error`]. The HTTP
//! layer derives a status code from it via [`Error::http_status`].

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "share", "file").
        entity: String,
        /// The public identifier that was looked up.
        id: String,
    },

    /// The caller has not presented valid credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but may not access this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) could not be run or exited non-zero.
    #[error("Tool error [{tool}]: {message}")]
    Tool { tool: String, message: String },

    /// Probing produced no usable metadata.
    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    /// A file was handed to a classification it does not support.
    #[error("Classification error: {0}")]
    Classification(String),

    /// An encoder run did not produce its artifact.
    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound { .. } => 404,
            Error::ProbeFailed(_) | Error::Classification(_) => 422,
            Error::TranscodeFailed(_) | Error::Tool { .. } => 502,
            Error::Database(_) | Error::Io { .. } | Error::Delivery(_) | Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code rendered next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::Validation(_) => "validation",
            Error::Database(_) => "database",
            Error::Io { .. } => "io",
            Error::Tool { .. } => "tool",
            Error::ProbeFailed(_) => "probe_failed",
            Error::Classification(_) => "classification",
            Error::TranscodeFailed(_) => "transcode_failed",
            Error::Delivery(_) => "delivery",
            Error::Internal(_) => "internal",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Error::Database(err.to_string())
    }
}

/// Result alias using the workspace [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
