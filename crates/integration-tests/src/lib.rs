//! Integration tests for the Diag Wheels storefront.
//!
//! Each test spawns the real storefront router on an ephemeral port, pointed
//! at a [`FakeBackend`] that answers the backend REST API in-process. No
//! external services are needed:
//!
//! ```bash
//! cargo test -p diag-wheels-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `public_pages` - Catalog, blog, content pages and response headers
//! - `auth_flow` - Login, logout, protected pages and session expiry
//! - `cart_checkout` - Cart fragments, product terms gate and payment
//! - `course_access` - Course player access by enrollment
//! - `admin_console` - Admin role gate and dashboard
//! - `kyc` - Product KYC and business upgrade eligibility

#![allow(clippy::missing_panics_doc)]

pub mod backend;

use std::path::PathBuf;

use reqwest::{Client, Response, multipart, redirect::Policy};
use tokio::net::TcpListener;

use diag_wheels_storefront::api::ApiClient;
use diag_wheels_storefront::config::StorefrontConfig;
use diag_wheels_storefront::content::ContentStore;
use diag_wheels_storefront::state::AppState;

pub use backend::FakeBackend;

/// A running storefront plus the backend it talks to.
pub struct TestApp {
    /// Storefront origin, without a trailing slash.
    pub base_url: String,
    /// Cookie-keeping client that does not follow redirects.
    pub client: Client,
    pub backend: FakeBackend,
}

fn storefront_dir(sub: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../storefront")
        .join(sub)
}

impl TestApp {
    /// Start a backend and a storefront wired to it.
    pub async fn spawn() -> Self {
        let backend = FakeBackend::spawn().await;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind storefront");
        let addr = listener.local_addr().expect("storefront address");
        let base_url = format!("http://{addr}");

        let config = StorefrontConfig {
            api_url: url::Url::parse(&backend.api_url()).expect("backend url"),
            host: addr.ip(),
            port: addr.port(),
            base_url: base_url.clone(),
            content_dir: storefront_dir("content"),
            static_dir: storefront_dir("static"),
            razorpay_key_id: None,
            vapid_public_key: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let api = ApiClient::new(&config).expect("api client");
        let content = ContentStore::load(&config.content_dir).expect("content");
        let app = diag_wheels_storefront::app(AppState::from_parts(config, api, content));

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("http client");

        Self {
            base_url,
            client,
            backend,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a page.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request")
    }

    /// GET a page as htmx would.
    pub async fn get_htmx(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .header("HX-Request", "true")
            .send()
            .await
            .expect("HX GET request")
    }

    /// POST a urlencoded form.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request")
    }

    /// POST a urlencoded form as htmx would.
    pub async fn post_htmx(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .expect("HX POST request")
    }

    /// POST a multipart form.
    pub async fn post_multipart(&self, path: &str, form: multipart::Form) -> Response {
        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("multipart POST request")
    }

    /// Sign in through the login form; panics unless it redirects.
    pub async fn login(&self, email: &str) {
        let response = self
            .post_form(
                "/auth/login",
                &[("email", email), ("password", backend::PASSWORD)],
            )
            .await;
        assert!(
            response.status().is_redirection(),
            "login for {email} returned {}",
            response.status()
        );
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
