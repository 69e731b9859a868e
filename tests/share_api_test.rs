//! Integration tests for share listing and password login.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{body_json, header_str, with_cookie, TestHarness};
use fileserve::config::Environment;

fn login_request(body: serde_json::Value) -> Request<Body> {
    Request::post("/api/share/auth")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint() {
    let h = TestHarness::new();
    let response = h.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn open_share_lists_files() {
    let h = TestHarness::new();
    let share = h.create_share("Holiday", None);
    h.add_file(&share, "beach.jpg", b"jpg");
    h.add_file(&share, "notes.txt", b"txt");

    let response = h.get(&format!("/api/share?reference={}", share.reference)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["name"], "Holiday");
    let files = json["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["fileName"], "beach.jpg");
    assert_eq!(files[0]["contentType"], "image/jpeg");
    assert_eq!(files[1]["fileName"], "notes.txt");
    assert!(files[0]["reference"].is_string());
    // Server paths never leave the server
    assert!(files[0].get("filePath").is_none());
}

#[tokio::test]
async fn protected_share_listing_requires_cookie() {
    let h = TestHarness::new();
    let share = h.create_share("Private", Some("hunter2"));
    let uri = format!("/api/share?reference={}", share.reference);

    let response = h.get(&uri).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Unauthorized");
    assert_eq!(json["name"], "Private");

    let response = h.get_unlocked(&uri, &share).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn listing_validates_parameters() {
    let h = TestHarness::new();
    assert_eq!(h.get("/api/share").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        h.get("/api/share?reference=does-not-exist").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn login_sets_cookie_that_unlocks_share() {
    let h = TestHarness::new();
    let share = h.create_share("Private", Some("hunter2"));

    let response = h
        .send(login_request(serde_json::json!({
            "reference": share.reference,
            "password": "hunter2",
        })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = header_str(&response, header::SET_COOKIE).to_string();
    assert!(set_cookie.starts_with(&format!("auth---{}=", share.reference)));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Secure"));
    assert_eq!(body_json(response).await["success"], true);

    // Replay the cookie exactly as the browser would
    let pair = set_cookie.split(';').next().unwrap().to_string();
    let request = Request::get(format!("/api/share?reference={}", share.reference))
        .header(header::COOKIE, pair)
        .body(Body::empty())
        .unwrap();
    assert_eq!(h.send(request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn development_cookie_is_not_secure() {
    let h = TestHarness::with_config(|config, _| {
        config.server.environment = Environment::Development;
    });
    let share = h.create_share("Dev", Some("pw"));

    let response = h
        .send(login_request(serde_json::json!({
            "reference": share.reference,
            "password": "pw",
        })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!header_str(&response, header::SET_COOKIE).contains("Secure"));
}

#[tokio::test]
async fn login_failures() {
    let h = TestHarness::new();
    let share = h.create_share("Private", Some("hunter2"));

    let wrong = h
        .send(login_request(serde_json::json!({
            "reference": share.reference,
            "password": "nope",
        })))
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(wrong.headers().get(header::SET_COOKIE).is_none());

    let missing = h
        .send(login_request(serde_json::json!({ "reference": share.reference })))
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let unknown = h
        .send(login_request(serde_json::json!({
            "reference": "unknown",
            "password": "x",
        })))
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stale_cookie_after_password_change() {
    let h = TestHarness::new();
    let share = h.create_share("Private", Some("old"));
    let uri = format!("/api/share?reference={}", share.reference);
    let stale = with_cookie(common::get(&uri), &share);

    {
        let conn = fileserve_db::pool::get_conn(&h.pool).unwrap();
        fileserve_db::queries::shares::update_share_password(&conn, share.id, Some("new")).unwrap();
    }

    assert_eq!(h.send(stale).await.status(), StatusCode::UNAUTHORIZED);
}
