//! Integration tests for signing in and out and for protected pages.

#![allow(clippy::unwrap_used)]

use diag_wheels_integration_tests::backend::{EXPIRED_EMAIL, PASSWORD, STUDENT_EMAIL};
use diag_wheels_integration_tests::{TestApp, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_protected_page_redirects_to_login_with_next() {
    let app = TestApp::spawn().await;

    let response = app.get("/account/orders").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response).as_deref(),
        Some("/auth/login?next=%2Faccount%2Forders")
    );
}

#[tokio::test]
async fn test_htmx_request_gets_hx_redirect() {
    let app = TestApp::spawn().await;

    let response = app.get_htmx("/notifications").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("hx-redirect").unwrap(),
        "/auth/login?next=%2Fnotifications"
    );
}

#[tokio::test]
async fn test_json_api_requires_auth() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/api/push/subscribe"))
        .json(&serde_json::json!({
            "endpoint": "https://push.example.com/abc",
            "keys": { "p256dh": "key", "auth": "secret" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_returns_to_next_and_shows_user() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/login",
            &[
                ("email", STUDENT_EMAIL),
                ("password", PASSWORD),
                ("next", "/account"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/account"));

    let response = app.get("/account").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("My account"));
    assert!(body.contains(STUDENT_EMAIL));
    assert!(body.contains(r#"value="Menon""#));
}

#[tokio::test]
async fn test_login_ignores_offsite_next() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/login",
            &[
                ("email", STUDENT_EMAIL),
                ("password", PASSWORD),
                ("next", "//evil.example.com"),
            ],
        )
        .await;
    assert_eq!(location(&response).as_deref(), Some("/"));
}

#[tokio::test]
async fn test_bad_credentials_show_backend_message() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/login",
            &[("email", STUDENT_EMAIL), ("password", "wrong")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Invalid email or password"));

    // Still signed out.
    let response = app.get("/account").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_blank_login_form_is_rejected_locally() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form("/auth/login", &[("email", ""), ("password", "")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains("Email and password are required")
    );
}

#[tokio::test]
async fn test_logout_revokes_token_and_clears_session() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;
    assert_eq!(app.get("/account").await.status(), StatusCode::OK);

    let response = app.post_form("/auth/logout", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/"));
    assert_eq!(app.backend.recorded().logouts, 1);

    assert_eq!(app.get("/account").await.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_rejected_token_signs_user_out() {
    let app = TestApp::spawn().await;
    app.login(EXPIRED_EMAIL).await;

    let response = app.get("/account").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/auth/login?expired=1"));

    let page = app.get("/auth/login?expired=1").await.text().await.unwrap();
    assert!(page.contains("Your session has expired"));

    // The session no longer holds the user.
    let response = app.get("/account").await;
    assert_eq!(
        location(&response).as_deref(),
        Some("/auth/login?next=%2Faccount")
    );
}
