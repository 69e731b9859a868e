//! HTTP rendering of [`fileserve_common::Error`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fileserve_common::Error;
use serde_json::json;

/// Handler error: either a domain error rendered as `{error, code}`, or a
/// ready-made response (auth denials, redirects).
#[derive(Debug)]
pub enum AppError {
    Api(Error),
    Denied(Response),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Api(err)
    }
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::Api(Error::Validation(message.into()))
    }
}

/// Message safe to show a client. Media and server failures can carry tool
/// output or paths, so they get a generic text.
fn public_message(err: &Error) -> String {
    match err {
        Error::NotFound { .. }
        | Error::Unauthorized(_)
        | Error::Forbidden(_)
        | Error::Validation(_) => err.to_string(),
        Error::ProbeFailed(_) | Error::Classification(_) => "Media could not be analyzed".into(),
        Error::TranscodeFailed(_) | Error::Tool { .. } => "Media conversion failed".into(),
        _ => "Internal server error".into(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            AppError::Denied(response) => return response,
            AppError::Api(err) => err,
        };

        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", err);
        } else {
            tracing::debug!("Request rejected: {}", err);
        }

        (
            status,
            Json(json!({ "error": public_message(&err), "code": err.code() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: Error) -> (StatusCode, serde_json::Value) {
        let response = AppError::from(err).into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn client_errors_keep_message() {
        let (status, body) = render(Error::not_found("share", "abc")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "share not found: abc");
        assert_eq!(body["code"], Error::not_found("share", "abc").code());
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let (status, body) = render(Error::TranscodeFailed("/srv/secret/movie.mkv: boom".into())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body["error"].as_str().unwrap().contains("/srv"));

        let (status, body) = render(Error::Internal("/var/lib/x".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn denied_passes_through() {
        let response = AppError::Denied(StatusCode::IM_A_TEAPOT.into_response()).into_response();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
