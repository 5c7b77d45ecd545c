//! Integration tests for the public, signed-out pages.

#![allow(clippy::unwrap_used)]

use diag_wheels_integration_tests::TestApp;
use reqwest::StatusCode;

// ============================================================================
// Health & Headers
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;

    let live = app.get("/health").await;
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(live.text().await.unwrap(), "ok");

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_pages_carry_security_headers_and_request_id() {
    let app = TestApp::spawn().await;
    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    let csp = headers
        .get("content-security-policy")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(csp.contains("'nonce-"), "CSP without nonce: {csp}");
    assert!(csp.contains("frame-ancestors 'none'"));
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert!(headers.get("x-request-id").is_some());

    let body = response.text().await.unwrap();
    assert!(body.contains("<script nonce=\""));
}

#[tokio::test]
async fn test_service_worker_served_from_root() {
    let app = TestApp::spawn().await;
    let response = app.get("/sw.js").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("service-worker-allowed").unwrap(), "/");
    assert!(response.text().await.unwrap().contains("notificationclick"));
}

#[tokio::test]
async fn test_static_stylesheet_served() {
    let app = TestApp::spawn().await;
    let response = app.get("/static/css/main.css").await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Home & Content Pages
// ============================================================================

#[tokio::test]
async fn test_home_shows_products_and_posts() {
    let app = TestApp::spawn().await;
    let body = app.get("/").await.text().await.unwrap();

    assert!(body.contains("Master modern vehicle diagnostics"));
    assert!(body.contains("OBD-II Scanner Pro"));
    assert!(body.contains("Reading Freeze Frame Data"));
}

#[tokio::test]
async fn test_about_and_terms_pages() {
    let app = TestApp::spawn().await;
    for path in ["/about", "/terms/courses", "/terms/products"] {
        let response = app.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
    let body = app.get("/about").await.text().await.unwrap();
    assert!(body.contains("About Us"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = TestApp::spawn().await;
    let response = app.get("/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Shop
// ============================================================================

#[tokio::test]
async fn test_shop_lists_products() {
    let app = TestApp::spawn().await;
    let response = app.get("/shop").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.text().await.unwrap();
    assert!(body.contains("<h1>Shop</h1>"));
    assert!(body.contains("OBD-II Scanner Pro"));
    assert!(body.contains("ECU Pinout Library"));
}

#[tokio::test]
async fn test_shop_filter_returns_fragment_for_htmx() {
    let app = TestApp::spawn().await;
    let response = app.get_htmx("/shop?type=digital").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.text().await.unwrap();
    assert!(!body.contains("<html"));
    assert!(body.contains("ECU Pinout Library"));
    assert!(!body.contains("OBD-II Scanner Pro"));
}

#[tokio::test]
async fn test_shop_category_breadcrumb() {
    let app = TestApp::spawn().await;
    let body = app.get("/shop?c0=Tools&c1=Scanners").await.text().await.unwrap();
    assert!(body.contains(r#"aria-label="Category path""#));
    assert!(body.contains(r#"<span class="crumb">Tools</span>"#));
    assert!(body.contains(r#"<span class="crumb">Scanners</span>"#));
    assert!(body.contains("OBD-II Scanner Pro"));
    assert!(!body.contains("ECU Pinout Library"));

    let unfiltered = app.get("/shop").await.text().await.unwrap();
    assert!(!unfiltered.contains(r#"aria-label="Category path""#));
}

#[tokio::test]
async fn test_shop_search_without_matches() {
    let app = TestApp::spawn().await;
    let body = app.get("/shop?q=brake+bleeder").await.text().await.unwrap();
    assert!(body.contains("No products match these filters."));
}

#[tokio::test]
async fn test_product_detail_and_missing_product() {
    let app = TestApp::spawn().await;

    let response = app.get("/shop/obd-scanner-pro").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("OBD-II Scanner Pro"));
    assert!(body.contains("Full-system scanner with live data."));

    let missing = app.get("/shop/no-such-product").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Blog
// ============================================================================

#[tokio::test]
async fn test_blog_index_and_search() {
    let app = TestApp::spawn().await;

    let body = app.get("/blog").await.text().await.unwrap();
    assert!(body.contains("Reading Freeze Frame Data"));

    let body = app.get("/blog?q=injector").await.text().await.unwrap();
    assert!(body.contains("No posts match your search."));
}

#[tokio::test]
async fn test_blog_post_renders_markdown() {
    let app = TestApp::spawn().await;

    let response = app.get("/blog/reading-freeze-frame-data").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Freeze frames</h2>"));

    let missing = app.get("/blog/no-such-post").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Courses
// ============================================================================

#[tokio::test]
async fn test_course_catalog_lists_content_courses() {
    let app = TestApp::spawn().await;
    let body = app.get("/courses").await.text().await.unwrap();
    assert!(body.contains("Diagnostic Tools"));
    assert!(body.contains("/courses/diagnostic-tools"));
}
