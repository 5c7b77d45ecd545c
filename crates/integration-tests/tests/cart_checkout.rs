//! Integration tests for the session cart and the checkout flow.

#![allow(clippy::unwrap_used)]

use diag_wheels_integration_tests::backend::STUDENT_EMAIL;
use diag_wheels_integration_tests::{TestApp, location};
use reqwest::StatusCode;

const SHIPPING: [(&str, &str); 8] = [
    ("first_name", "Asha"),
    ("last_name", "Menon"),
    ("email", STUDENT_EMAIL),
    ("phone", "9876543210"),
    ("address", "12 MG Road"),
    ("city", "Kochi"),
    ("state", "Kerala"),
    ("pincode", "682001"),
];

async fn accept_product_terms(app: &TestApp) {
    let response = app
        .post_form(
            "/terms/product/accept",
            &[("agree", "on"), ("next", "/checkout")],
        )
        .await;
    assert_eq!(location(&response).as_deref(), Some("/checkout"));
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_htmx_add_triggers_cart_refresh() {
    let app = TestApp::spawn().await;

    let response = app
        .post_htmx("/cart/add", &[("slug", "obd-scanner-pro"), ("quantity", "2")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("hx-trigger").unwrap(), "cart-updated");
    let body = response.text().await.unwrap();
    assert!(body.contains("OBD-II Scanner Pro added to cart"));

    let badge = app.get_htmx("/cart/count").await.text().await.unwrap();
    assert!(badge.contains(r#"<span class="badge">2</span>"#));
}

#[tokio::test]
async fn test_out_of_stock_product_is_refused() {
    let app = TestApp::spawn().await;

    let response = app
        .post_htmx("/cart/add", &[("slug", "tpms-relearn-tool")])
        .await;
    assert!(response.headers().get("hx-trigger").is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("TPMS Relearn Tool is out of stock"));

    let badge = app.get_htmx("/cart/count").await.text().await.unwrap();
    assert!(!badge.contains("badge"));
}

#[tokio::test]
async fn test_plain_form_add_redirects_to_cart() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form("/cart/add", &[("slug", "ecu-pinout-library")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/cart"));

    let body = app.get("/cart").await.text().await.unwrap();
    assert!(body.contains("ECU Pinout Library added to cart"));
    assert!(body.contains("ECU Pinout Library"));
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let app = TestApp::spawn().await;
    app.post_htmx("/cart/add", &[("slug", "obd-scanner-pro")])
        .await;

    let response = app
        .post_htmx(
            "/cart/update",
            &[("product_id", "prod-scanner"), ("quantity", "0")],
        )
        .await;
    assert_eq!(response.headers().get("hx-trigger").unwrap(), "cart-updated");
    let fragment = response.text().await.unwrap();
    assert!(fragment.contains(r#"id="cart-items""#));
    assert!(fragment.contains("Your cart is empty."));
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_requires_login() {
    let app = TestApp::spawn().await;

    let response = app.get("/checkout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response).as_deref(),
        Some("/auth/login?next=%2Fcheckout")
    );
}

#[tokio::test]
async fn test_checkout_with_empty_cart() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;

    let body = app.get("/checkout").await.text().await.unwrap();
    assert!(body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_order_needs_product_terms() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;
    app.post_htmx("/cart/add", &[("slug", "obd-scanner-pro")])
        .await;

    let response = app.post_form("/checkout", &SHIPPING).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Please accept the product terms before placing your order."));
    assert!(app.backend.recorded().orders.is_empty());
}

#[tokio::test]
async fn test_invalid_shipping_form_shows_field_errors() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;
    accept_product_terms(&app).await;
    app.post_htmx("/cart/add", &[("slug", "obd-scanner-pro")])
        .await;

    let mut form = SHIPPING.to_vec();
    form.retain(|(name, _)| *name != "pincode");
    form.push(("pincode", " "));
    let body = app.post_form("/checkout", &form).await.text().await.unwrap();
    assert!(body.contains("Pincode is required"));
    assert!(app.backend.recorded().orders.is_empty());
}

#[tokio::test]
async fn test_full_checkout_and_payment_verification() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;
    accept_product_terms(&app).await;
    assert!(app.backend.recorded().product_terms_accepted);

    app.post_htmx("/cart/add", &[("slug", "obd-scanner-pro"), ("quantity", "2")])
        .await;

    let response = app.post_form("/checkout", &SHIPPING).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Complete your payment"));
    assert!(body.contains(r#"data-order-id="order_rzp_1""#));
    assert!(body.contains(r#"data-key="rzp_test_backend""#));

    {
        let recorded = app.backend.recorded();
        let order = recorded.orders.first().unwrap();
        assert_eq!(order["items"][0]["product_id"], "prod-scanner");
        assert_eq!(order["items"][0]["quantity"], 2);
        assert_eq!(order["shipping_address"]["full_name"], "Asha Menon");
        assert_eq!(order["shipping_address"]["pincode"], "682001");
    }

    // A callback for some other order is refused.
    let response = app
        .post_form(
            "/checkout/verify",
            &[
                ("internal_order_id", "order-999"),
                ("razorpay_order_id", "order_rzp_1"),
                ("razorpay_payment_id", "pay_1"),
                ("razorpay_signature", "valid-signature"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_form(
            "/checkout/verify",
            &[
                ("internal_order_id", "order-1"),
                ("razorpay_order_id", "order_rzp_1"),
                ("razorpay_payment_id", "pay_1"),
                ("razorpay_signature", "valid-signature"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Thank you for your order"));
    assert_eq!(app.backend.recorded().verified_payments.len(), 1);

    let badge = app.get_htmx("/cart/count").await.text().await.unwrap();
    assert!(!badge.contains("badge"));
}

#[tokio::test]
async fn test_retry_after_payment_start_failure_reuses_order() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;
    accept_product_terms(&app).await;
    app.post_htmx("/cart/add", &[("slug", "obd-scanner-pro")])
        .await;
    app.backend.recorded().payment_start_failures = 1;

    let response = app.post_form("/checkout", &SHIPPING).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("payment could not be started: Payment gateway unavailable"));

    let response = app.post_form("/checkout", &SHIPPING).await;
    let body = response.text().await.unwrap();
    assert!(body.contains("Complete your payment"));

    let recorded = app.backend.recorded();
    assert_eq!(recorded.orders.len(), 1);
    assert_eq!(recorded.payment_orders, ["order-1", "order-1"]);
}

#[tokio::test]
async fn test_changed_cart_places_new_order() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;
    accept_product_terms(&app).await;
    app.post_htmx("/cart/add", &[("slug", "obd-scanner-pro")])
        .await;
    app.post_form("/checkout", &SHIPPING).await;

    app.post_htmx("/cart/add", &[("slug", "ecu-pinout-library")])
        .await;
    app.post_form("/checkout", &SHIPPING).await;

    let recorded = app.backend.recorded();
    assert_eq!(recorded.orders.len(), 2);
    assert_eq!(recorded.payment_orders, ["order-1", "order-2"]);
}

#[tokio::test]
async fn test_failed_signature_keeps_cart() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;
    accept_product_terms(&app).await;
    app.post_htmx("/cart/add", &[("slug", "obd-scanner-pro")])
        .await;
    app.post_form("/checkout", &SHIPPING).await;

    let response = app
        .post_form(
            "/checkout/verify",
            &[
                ("internal_order_id", "order-1"),
                ("razorpay_order_id", "order_rzp_1"),
                ("razorpay_payment_id", "pay_1"),
                ("razorpay_signature", "forged"),
            ],
        )
        .await;
    assert_eq!(location(&response).as_deref(), Some("/cart"));

    let body = app.get("/cart").await.text().await.unwrap();
    assert!(body.contains("Payment verification failed: Invalid payment signature"));
    assert!(body.contains("OBD-II Scanner Pro"));
}

#[tokio::test]
async fn test_digital_only_order_has_no_shipping_address() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;
    accept_product_terms(&app).await;
    app.post_htmx("/cart/add", &[("slug", "ecu-pinout-library")])
        .await;

    let response = app.post_form("/checkout", &SHIPPING).await;
    assert_eq!(response.status(), StatusCode::OK);

    let recorded = app.backend.recorded();
    let order = recorded.orders.first().unwrap();
    assert_eq!(order["items"][0]["product_id"], "prod-guide");
    assert!(order.get("shipping_address").is_none());
}
