//! Integration tests for product KYC and business upgrade eligibility.

#![allow(clippy::unwrap_used)]

use diag_wheels_integration_tests::backend::{ADMIN_EMAIL, STUDENT_EMAIL};
use diag_wheels_integration_tests::{TestApp, location};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};

fn kyc_form() -> Form {
    let proof = || {
        Part::bytes(vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a])
            .file_name("aadhaar.png")
            .mime_str("image/png")
            .unwrap()
    };
    Form::new()
        .text("full_name", "Asha Menon")
        .text("address", "12 MG Road, Kochi")
        .text("contact_number", "9876543210")
        .text("whatsapp_number", "9876543210")
        .part("id_proofs", proof())
        .part("id_proofs", proof())
}

fn upgrade_form() -> Form {
    Form::new()
        .text("business_id", "GSTIN29ABCDE1234F1Z5")
        .text("business_location_link", "https://maps.example.com/garage")
}

#[tokio::test]
async fn test_kyc_under_review_cannot_be_resubmitted() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;

    let response = app.post_multipart("/kyc/product", kyc_form()).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/kyc/product"));
    assert_eq!(app.backend.recorded().kyc_submissions, 0);

    let body = app.get("/kyc/product").await.text().await.unwrap();
    assert!(body.contains("Your KYC is already under review"));
}

#[tokio::test]
async fn test_non_student_cannot_upgrade_to_business() {
    let app = TestApp::spawn().await;
    app.login(ADMIN_EMAIL).await;

    let response = app.post_multipart("/kyc/business-upgrade", upgrade_form()).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.backend.recorded().business_upgrades, 0);

    let body = app.get("/kyc/product").await.text().await.unwrap();
    assert!(body.contains("Only student accounts can upgrade to business owner."));
}

#[tokio::test]
async fn test_student_upgrade_reaches_backend() {
    let app = TestApp::spawn().await;
    app.login(STUDENT_EMAIL).await;

    let response = app.post_multipart("/kyc/business-upgrade", upgrade_form()).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.backend.recorded().business_upgrades, 1);

    let body = app.get("/kyc/product").await.text().await.unwrap();
    assert!(body.contains("Upgraded to business owner"));
}
