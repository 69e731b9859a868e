//! Shared test harness for integration tests.
//!
//! [`TestHarness`] builds a full [`AppContext`] over an in-memory database, a
//! [`FakeToolkit`] and a temporary data directory, and drives the router with
//! `oneshot`.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use fileserve::config::Config;
use fileserve::server::{create_router, AppContext};
use fileserve_av::fake::FakeToolkit;
use fileserve_av::MediaMetadata;
use fileserve_db::pool::{get_conn, init_memory_pool, DbPool};
use fileserve_db::queries::{share_files, shares};
use fileserve_db::{Share, ShareFile, SqliteShareRepository};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestHarness {
    _dir: TempDir,
    /// Canonical temp root; media and data live below it.
    pub root: PathBuf,
    pub media: PathBuf,
    pub pool: DbPool,
    pub toolkit: Arc<FakeToolkit>,
    pub ctx: AppContext,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(|_, _| {})
    }

    /// Harness whose default config (data dir already pointed at the temp
    /// root) is adjusted by `adjust`.
    pub fn with_config(adjust: impl FnOnce(&mut Config, &PathBuf)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = dir.path().canonicalize().expect("failed to canonicalize temp dir");
        let media = root.join("media");
        std::fs::create_dir_all(&media).expect("failed to create media dir");

        let mut config = Config::default();
        config.storage.data_dir = root.join("data");
        adjust(&mut config, &root);

        let pool = init_memory_pool().expect("failed to create in-memory pool");
        let toolkit = Arc::new(FakeToolkit::new());
        let ctx = AppContext::new(
            config,
            Arc::new(SqliteShareRepository::new(pool.clone())),
            toolkit.clone(),
        );

        Self {
            _dir: dir,
            root,
            media,
            pool,
            toolkit,
            ctx,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone(), None)
    }

    pub fn create_share(&self, name: &str, password: Option<&str>) -> Share {
        let conn = get_conn(&self.pool).unwrap();
        shares::create_share(&conn, name, password).unwrap()
    }

    /// Write `contents` to the media directory and register it in the share.
    pub fn add_file(&self, share: &Share, file_name: &str, contents: &[u8]) -> ShareFile {
        let path = self.media.join(file_name);
        std::fs::write(&path, contents).unwrap();
        let conn = get_conn(&self.pool).unwrap();
        share_files::add_file_to_share(&conn, share.id, &path, None).unwrap()
    }

    pub fn set_metadata(&self, file_name: &str, meta: MediaMetadata) {
        self.toolkit.set_metadata(file_name, meta);
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(get(uri)).await
    }

    /// GET carrying the share's auth cookie.
    pub async fn get_unlocked(&self, uri: &str, share: &Share) -> Response {
        self.send(with_cookie(get(uri), share)).await
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn with_cookie(mut request: Request<Body>, share: &Share) -> Request<Body> {
    let token = share.auth_token().expect("share is not protected");
    let cookie = format!("{}={}", fileserve::auth::cookie_name(&share.reference), token);
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    request
}

pub fn file_uri(endpoint: &str, share: &Share, file: &ShareFile) -> String {
    format!(
        "/api/share/{}?share={}&reference={}",
        endpoint, share.reference, file.reference
    )
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn header_str<'a>(response: &'a Response, name: impl header::AsHeaderName) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
