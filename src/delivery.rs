//! Response construction for shared files.
//!
//! Two strategies emit the same content headers:
//!
//! - **Direct**: the file is streamed from this process with HTTP range
//!   support.
//! - **Accelerated**: the body is empty and an `X-Accel-Redirect` header
//!   hands the transfer to the fronting proxy.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use fileserve_common::{Error, Result};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::config::DeliveryConfig;

pub const X_ACCEL_REDIRECT: &str = "x-accel-redirect";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    #[default]
    Direct,
    Accelerated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// What the endpoint intends; resolved against the content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispositionHint {
    Download,
    /// Inline when the browser can render the type, attachment otherwise.
    View,
    Force(Disposition),
}

impl DispositionHint {
    pub fn resolve(self, content_type: &str) -> Disposition {
        match self {
            DispositionHint::Download => Disposition::Attachment,
            DispositionHint::Force(d) => d,
            DispositionHint::View if is_renderable(content_type) => Disposition::Inline,
            DispositionHint::View => Disposition::Attachment,
        }
    }
}

fn is_renderable(content_type: &str) -> bool {
    ["image/", "video/", "audio/"]
        .iter()
        .any(|prefix| content_type.starts_with(prefix))
        || content_type.eq_ignore_ascii_case("application/x-mpegurl")
        || content_type.eq_ignore_ascii_case("application/vnd.apple.mpegurl")
}

/// `Content-Disposition` value with an ASCII fallback name and the exact
/// name in RFC 5987 form.
pub fn content_disposition(disposition: Disposition, display_name: &str) -> String {
    let fallback: String = display_name
        .chars()
        .map(|c| {
            if !c.is_ascii() || c.is_ascii_control() || c == '"' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect();

    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition.as_str(),
        fallback,
        urlencoding::encode(display_name)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteRange {
    /// Inclusive start and end.
    Satisfiable(u64, u64),
    Unsatisfiable,
    /// Absent, malformed or multi-range: serve the whole file.
    Ignored,
}

/// Parse a single-range `Range` header.
///
/// Supports `bytes=0-499`, `bytes=500-` and `bytes=-500` (last 500 bytes).
fn parse_range_header(header: Option<&str>, file_size: u64) -> ByteRange {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Ignored;
    };
    if spec.contains(',') || file_size == 0 {
        return ByteRange::Ignored;
    }
    let Some((start, end)) = spec.split_once('-') else {
        return ByteRange::Ignored;
    };
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        (true, false) => match end.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(suffix) => ByteRange::Satisfiable(file_size.saturating_sub(suffix), file_size - 1),
            Err(_) => ByteRange::Ignored,
        },
        (false, true) => match start.parse::<u64>() {
            Ok(start) if start >= file_size => ByteRange::Unsatisfiable,
            Ok(start) => ByteRange::Satisfiable(start, file_size - 1),
            Err(_) => ByteRange::Ignored,
        },
        (false, false) => match (start.parse::<u64>(), end.parse::<u64>()) {
            (Ok(start), Ok(_)) if start >= file_size => ByteRange::Unsatisfiable,
            (Ok(start), Ok(end)) if start > end => ByteRange::Ignored,
            (Ok(start), Ok(end)) => ByteRange::Satisfiable(start, end.min(file_size - 1)),
            _ => ByteRange::Ignored,
        },
        (true, true) => ByteRange::Ignored,
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryAdapter {
    mode: DeliveryMode,
    internal_prefix: String,
    internal_root: PathBuf,
}

impl DeliveryAdapter {
    pub fn new(mode: DeliveryMode, internal_prefix: impl Into<String>, internal_root: PathBuf) -> Self {
        Self {
            mode,
            internal_prefix: internal_prefix.into(),
            internal_root,
        }
    }

    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(
            config.mode,
            config.internal_prefix.clone(),
            config.internal_root.clone(),
        )
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Build the response for an already resolved file.
    pub async fn deliver(
        &self,
        path: &Path,
        display_name: &str,
        content_type: &str,
        hint: DispositionHint,
        request_headers: &HeaderMap,
    ) -> Result<Response> {
        let disposition = content_disposition(hint.resolve(content_type), display_name);
        match self.mode {
            DeliveryMode::Direct => {
                let range = request_headers
                    .get(header::RANGE)
                    .and_then(|h| h.to_str().ok());
                stream_file(path, content_type, &disposition, range).await
            }
            DeliveryMode::Accelerated => {
                let target = self.redirect_target(path)?;
                Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CONTENT_DISPOSITION, disposition)
                    .header(header::ACCEPT_RANGES, "bytes")
                    .header(X_ACCEL_REDIRECT, target)
                    .body(Body::empty())
                    .map_err(|e| Error::Delivery(e.to_string()))
            }
        }
    }

    /// `internal_prefix` plus the percent-encoded path below `internal_root`.
    fn redirect_target(&self, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.internal_root).map_err(|_| {
            tracing::error!(
                "{:?} is outside the accelerated root {:?}",
                path,
                self.internal_root
            );
            Error::Delivery("file is outside the accelerated root".into())
        })?;

        let mut target = self.internal_prefix.trim_end_matches('/').to_string();
        for segment in relative.iter() {
            target.push('/');
            target.push_str(&urlencoding::encode(&segment.to_string_lossy()));
        }
        Ok(target)
    }
}

async fn stream_file(
    path: &Path,
    content_type: &str,
    disposition: &str,
    range: Option<&str>,
) -> Result<Response> {
    let mut file = File::open(path).await.map_err(|e| {
        tracing::error!("Failed to open {:?}: {}", path, e);
        Error::Delivery("file could not be opened".into())
    })?;
    let file_size = file.metadata().await?.len();

    let builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::ACCEPT_RANGES, "bytes");

    let (builder, start, length) = match parse_range_header(range, file_size) {
        ByteRange::Unsatisfiable => {
            return builder
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(header::CONTENT_RANGE, format!("bytes */{file_size}"))
                .body(Body::empty())
                .map_err(|e| Error::Delivery(e.to_string()));
        }
        ByteRange::Satisfiable(start, end) => (
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, format!("bytes {start}-{end}/{file_size}")),
            start,
            end - start + 1,
        ),
        ByteRange::Ignored => (builder.status(StatusCode::OK), 0, file_size),
    };

    if start > 0 {
        file.seek(SeekFrom::Start(start)).await?;
    }

    let served = path.to_path_buf();
    let stream = ReaderStream::new(file.take(length)).inspect_err(move |e| {
        tracing::warn!("Aborted transfer of {:?}: {}", served, e);
    });

    builder
        .header(header::CONTENT_LENGTH, HeaderValue::from(length))
        .body(Body::from_stream(stream))
        .map_err(|e| Error::Delivery(e.to_string()))
}
