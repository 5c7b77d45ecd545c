//! Integration tests for the admin console role gate.

#![allow(clippy::unwrap_used)]

use diag_wheels_integration_tests::backend::{ADMIN_EMAIL, STUDENT_EMAIL};
use diag_wheels_integration_tests::{TestApp, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_admin_requires_login() {
    let app = TestApp::spawn().await;

    let response = app.get("/admin").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response).as_deref(),
        Some("/auth/login?next=%2Fadmin")
    );
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;

    let response = app.get("/admin").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response.text().await.unwrap();
    assert!(body.contains("have access to this page"));
}

#[tokio::test]
async fn test_dashboard_shows_stats_and_pending_requests() {
    let app = TestApp::spawn().await;
    app.login(ADMIN_EMAIL).await;

    let response = app.get("/admin").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Admin dashboard"));
    assert!(body.contains(r#"<span class="stat-value">42</span>"#));
    assert!(body.contains("ADAS Calibration"));
    assert!(body.contains("/admin/requests/req-1/approve"));
}

#[tokio::test]
async fn test_approving_a_request() {
    let app = TestApp::spawn().await;
    app.login(ADMIN_EMAIL).await;

    let response = app
        .post_form("/admin/requests/req-1/approve", &[("admin_notes", "Welcome aboard")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/admin/requests"));
    assert_eq!(app.backend.recorded().approved_requests, vec!["req-1".to_string()]);
}

#[tokio::test]
async fn test_student_cannot_approve() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;

    let response = app
        .post_form("/admin/requests/req-1/approve", &[])
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.backend.recorded().approved_requests.is_empty());
}
