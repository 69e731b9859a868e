//! Share API routes.
//!
//! Every route except login is gated by the share's auth cookie. Denials are
//! rendered per endpoint: JSON for the listing, a redirect to the login page
//! for file links opened in the browser, a bare 401 for HLS requests.

use std::path::Path;

use axum::{
    extract::{Path as UrlPath, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use fileserve_av::classify::{needs_preview, webify_mode};
use fileserve_av::WebifyMode;
use fileserve_common::paths::{content_type, is_video_file, is_web_image};
use fileserve_common::Error;
use fileserve_db::{Share, ShareFile};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::AppError;
use super::AppContext;
use crate::auth::{auth_cookie, authorize_file, Authorization, LoginOutcome};
use crate::delivery::{Disposition, DispositionHint};
use crate::resolve::{for_reference, resolve_regular_file};
use crate::webify::ArtifactStore;

const HLS_PLAYLIST_TYPE: &str = "application/x-mpegURL";
const HLS_SEGMENT_TYPE: &str = "video/mp2t";

/// Create share routes.
pub fn share_routes() -> Router<AppContext> {
    Router::new()
        .route("/share", get(get_share))
        .route("/share/auth", post(login))
        .route("/share/file", get(download_file))
        .route("/share/file/view", get(view_file))
        .route("/share/hls/:share/:reference/:filename", get(hls_file))
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub reference: Option<String>,
    pub share: Option<String>,
    pub download: Option<String>,
}

impl FileQuery {
    fn wants_download(&self) -> bool {
        self.download
            .as_deref()
            .is_some_and(|v| !matches!(v, "0" | "false"))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub reference: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub name: String,
    pub files: Vec<ShareFileResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareFileResponse {
    pub reference: String,
    pub file_name: String,
    pub content_type: String,
}

impl From<ShareFile> for ShareFileResponse {
    fn from(file: ShareFile) -> Self {
        Self {
            content_type: content_type(Path::new(&file.file_path)).to_string(),
            reference: file.reference,
            file_name: file.file_name,
        }
    }
}

// ============================================================================
// Access checks
// ============================================================================

/// How a denied request is answered.
#[derive(Debug, Clone, Copy)]
enum Denial {
    /// 401 with the share name, for the SPA.
    Json,
    /// Back to the login page for this share.
    Redirect,
    Plain,
}

impl Denial {
    fn render(self, share_reference: &str, share_name: &str) -> AppError {
        let response = match self {
            Denial::Json => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized", "name": share_name })),
            )
                .into_response(),
            Denial::Redirect => {
                Redirect::to(&format!("/?share={}", urlencoding::encode(share_reference)))
                    .into_response()
            }
            Denial::Plain => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
        };
        AppError::Denied(response)
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("missing parameter: {name}")))
}

fn unlock_share(
    ctx: &AppContext,
    share_reference: &str,
    jar: &CookieJar,
    denial: Denial,
) -> Result<Share, AppError> {
    match ctx.gate.authorize_cookies(share_reference, jar)? {
        Authorization::Allowed(share) => Ok(share),
        Authorization::Unauthorized { share_name } => Err(denial.render(share_reference, &share_name)),
        Authorization::NotFound => Err(Error::not_found("share", share_reference).into()),
    }
}

/// Unlock the share and load one of its files.
fn unlock_file(
    ctx: &AppContext,
    share_reference: &str,
    file_reference: &str,
    jar: &CookieJar,
    denial: Denial,
) -> Result<(Share, ShareFile), AppError> {
    let share = unlock_share(ctx, share_reference, jar, denial)?;
    let file = ctx
        .repository
        .file_by_reference(file_reference)?
        .ok_or_else(|| Error::not_found("file", file_reference))?;
    authorize_file(&share, &file)?;
    Ok((share, file))
}

// ============================================================================
// Handlers
// ============================================================================

/// List a share's files.
async fn get_share(
    State(ctx): State<AppContext>,
    Query(query): Query<ShareQuery>,
    jar: CookieJar,
) -> Result<Json<ShareResponse>, AppError> {
    let reference = required(&query.reference, "reference")?;
    let share = unlock_share(&ctx, reference, &jar, Denial::Json)?;
    let files = ctx.repository.files_of_share(share.id)?;

    Ok(Json(ShareResponse {
        name: share.name,
        files: files.into_iter().map(ShareFileResponse::from).collect(),
    }))
}

/// Exchange a share password for the auth cookie.
async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let reference = required(&body.reference, "reference")?;
    let password = required(&body.password, "password")?;

    match ctx.gate.login(reference, password)? {
        LoginOutcome::Token(token) => {
            let secure = !ctx.config.server.environment.is_development();
            let jar = jar.add(auth_cookie(reference, token, secure));
            Ok((jar, Json(json!({ "success": true }))).into_response())
        }
        LoginOutcome::Open => Ok(Json(json!({ "success": true })).into_response()),
        LoginOutcome::InvalidPassword => Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid password" })),
        )
            .into_response()),
        LoginOutcome::NotFound => Err(Error::not_found("share", reference).into()),
    }
}

/// The original file, as an attachment.
async fn download_file(
    State(ctx): State<AppContext>,
    Query(query): Query<FileQuery>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let share_reference = required(&query.share, "share")?;
    let file_reference = required(&query.reference, "reference")?;
    let (_, file) = unlock_file(&ctx, share_reference, file_reference, &jar, Denial::Redirect)?;

    let source = resolve_regular_file(&file.file_path)
        .await
        .map_err(|e| for_reference(e, &file.reference))?;
    let response = ctx
        .delivery
        .deliver(
            &source,
            &file.file_name,
            content_type(Path::new(&file.file_path)),
            DispositionHint::Download,
            &headers,
        )
        .await?;
    Ok(response)
}

/// In-browser view: the webify artifact, a preview, or the source itself.
async fn view_file(
    State(ctx): State<AppContext>,
    Query(query): Query<FileQuery>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let share_reference = required(&query.share, "share")?;
    let file_reference = required(&query.reference, "reference")?;
    let (share, file) = unlock_file(&ctx, share_reference, file_reference, &jar, Denial::Redirect)?;

    let hint = if query.wants_download() {
        DispositionHint::Force(Disposition::Attachment)
    } else {
        DispositionHint::View
    };
    let stored = Path::new(&file.file_path);
    let source = resolve_regular_file(stored)
        .await
        .map_err(|e| for_reference(e, &file.reference))?;

    if is_video_file(stored) {
        // The stored name decides the kind; ffprobe follows links itself
        let meta = ctx.classifier.inspect(stored).await?;
        let artifacts = ctx.transcoder.artifacts();

        match webify_mode(&meta)? {
            WebifyMode::Stream => {
                if ArtifactStore::exists(&artifacts.playlist_path(&file.file_path)).await {
                    let location = format!(
                        "/api/share/hls/{}/{}/playlist.m3u8",
                        urlencoding::encode(&share.reference),
                        urlencoding::encode(&file.reference)
                    );
                    return Ok(Redirect::to(&location).into_response());
                }
            }
            WebifyMode::Optimized => {
                let optimized = artifacts.optimized_path(&file.file_path);
                if ArtifactStore::exists(&optimized).await {
                    return deliver_artifact(&ctx, &optimized, &file, hint, &headers).await;
                }
            }
        }

        if needs_preview(&meta)? {
            let preview = artifacts.preview_path(&file.file_path);
            if !ArtifactStore::exists(&preview).await {
                return Err(Error::not_found("preview", &file.reference).into());
            }
            return deliver_artifact(&ctx, &preview, &file, hint, &headers).await;
        }

        let response = ctx
            .delivery
            .deliver(&source, &file.file_name, content_type(stored), hint, &headers)
            .await?;
        return Ok(response);
    }

    if is_web_image(stored) {
        let response = ctx
            .delivery
            .deliver(&source, &file.file_name, content_type(stored), hint, &headers)
            .await?;
        return Ok(response);
    }

    Err(Error::not_found("File preview", &file.reference).into())
}

/// Artifacts keep the source's container, so the type follows the stored path.
async fn deliver_artifact(
    ctx: &AppContext,
    artifact: &Path,
    file: &ShareFile,
    hint: DispositionHint,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    let real = resolve_regular_file(artifact)
        .await
        .map_err(|e| for_reference(e, &file.reference))?;
    let response = ctx
        .delivery
        .deliver(
            &real,
            &file.file_name,
            content_type(Path::new(&file.file_path)),
            hint,
            headers,
        )
        .await?;
    Ok(response)
}

/// Playlist or segment of a published stream.
async fn hls_file(
    State(ctx): State<AppContext>,
    UrlPath((share_reference, file_reference, filename)): UrlPath<(String, String, String)>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (_, file) = unlock_file(&ctx, &share_reference, &file_reference, &jar, Denial::Plain)?;
    let entry = ctx.transcoder.artifacts().stream_entry(&file.file_path, &filename)?;

    let mime = match Path::new(&filename).extension().and_then(|e| e.to_str()) {
        Some("m3u8") => HLS_PLAYLIST_TYPE,
        Some("ts") => HLS_SEGMENT_TYPE,
        _ => return Err(Error::Forbidden("not a stream file".into()).into()),
    };

    let real = resolve_regular_file(&entry)
        .await
        .map_err(|e| for_reference(e, &file.reference))?;
    let response = ctx
        .delivery
        .deliver(&real, &filename, mime, DispositionHint::View, &headers)
        .await?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(download: Option<&str>) -> FileQuery {
        FileQuery {
            reference: None,
            share: None,
            download: download.map(String::from),
        }
    }

    #[test]
    fn download_flag() {
        assert!(!query(None).wants_download());
        assert!(!query(Some("0")).wants_download());
        assert!(!query(Some("false")).wants_download());
        assert!(query(Some("1")).wants_download());
        assert!(query(Some("true")).wants_download());
        assert!(query(Some("")).wants_download());
    }

    #[test]
    fn file_response_uses_stored_extension() {
        let response = ShareFileResponse::from(ShareFile {
            id: 1,
            share_id: 1,
            file_path: "/srv/clip.mp4".into(),
            file_name: "Holiday clip".into(),
            reference: "r".into(),
        });
        assert_eq!(response.content_type, "video/mp4");
        assert_eq!(response.file_name, "Holiday clip");
    }

    #[test]
    fn missing_parameters_are_rejected() {
        assert!(required(&None, "share").is_err());
        assert!(required(&Some(String::new()), "share").is_err());
        assert_eq!(required(&Some("x".into()), "share").unwrap(), "x");
    }
}
