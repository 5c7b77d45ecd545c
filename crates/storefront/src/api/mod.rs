//! Client for the Diag Wheels backend REST API.
//!
//! # Architecture
//!
//! - The backend is the source of truth for users, products, orders, KYC
//!   records and course progress. Nothing is stored locally.
//! - Every response is wrapped in `{ success, message?, data? }`.
//! - Per-user calls carry the backend token as a `Bearer` header.
//! - Anonymous catalog reads (products, blog) are cached in memory via
//!   `moka` for 5 minutes. Admin writes invalidate the whole cache.
//!
//! Endpoint groups live in submodules as `impl ApiClient` blocks.
//!
//! # Example
//!
//! ```rust,ignore
//! use diag_wheels_storefront::api::ApiClient;
//!
//! let api = ApiClient::new(&config)?;
//! let products = api.list_products(&ProductQuery::default()).await?;
//! let me = api.profile(&user.token()).await?;
//! ```

mod admin;
mod auth;
mod blog;
mod cache;
mod kyc;
mod learning;
mod notifications;
mod shop;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::StorefrontConfig;

pub use admin::UserQuery;
pub use blog::BLOG_PAGE_SIZE;
pub use shop::ProductQuery;
pub use types::*;

use cache::CacheValue;

/// Per-request timeout for backend calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The backend returned 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend rejected the bearer token.
    #[error("Session expired")]
    SessionExpired,

    /// The backend answered with an error status or `success: false`.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A successful envelope had no `data` where data was required.
    #[error("Response contained no data")]
    MissingData,
}

impl ApiError {
    /// Message safe to show inline to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::NotFound(_) => "The requested item could not be found.".to_string(),
            Self::SessionExpired => "Your session has expired. Please login again.".to_string(),
            Self::RateLimited(_) => "Too many requests. Please wait a moment and try again.".to_string(),
            Self::Http(_) | Self::Parse(_) | Self::Url(_) | Self::MissingData => {
                "We couldn't reach the server. Please check your connection and try again."
                    .to_string()
            }
        }
    }
}

/// The backend response wrapper.
#[derive(Debug, serde::Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, ApiError> {
        self.data.ok_or(ApiError::MissingData)
    }
}

/// Request body variants.
enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(reqwest::multipart::Form),
}

impl Body {
    fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        Ok(Self::Json(serde_json::to_value(body)?))
    }
}

/// A file received from the browser, forwarded to the backend as-is.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    fn into_part(self) -> Result<reqwest::multipart::Part, ApiError> {
        Ok(reqwest::multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?)
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the backend REST API.
///
/// Cheap to clone; all clones share one connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    asset_origin: String,
    cache: Cache<String, CacheValue>,
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("diag-wheels-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                asset_origin: asset_origin(&config.api_url),
                base_url: config.api_url.clone(),
                cache,
            }),
        })
    }

    /// Absolute URL for a file served by the backend (uploads, proofs).
    ///
    /// Absolute URLs pass through unchanged.
    #[must_use]
    pub fn asset_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{path}", self.inner.asset_origin)
        } else {
            format!("{}/{path}", self.inner.asset_origin)
        }
    }

    /// Drop every cached catalog entry.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Readiness probe: any HTTP answer from the backend counts.
    pub async fn ping(&self) -> bool {
        match self.url("health", &[]) {
            Ok(url) => self.inner.client.get(url).send().await.is_ok(),
            Err(_) => false,
        }
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Body,
        token: Option<&SecretString>,
    ) -> Result<Envelope<T>, ApiError> {
        let url = self.url(path, query)?;
        debug!(%method, path, "backend request");

        let mut request = self.inner.client.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        request = match body {
            Body::Empty => request,
            Body::Json(value) => request.json(&value),
            Body::Multipart(form) => request.multipart(form),
        };

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let text = response.text().await?;
        interpret(status, &text, token.is_some(), path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        self.send(Method::GET, path, query, Body::Empty, token)
            .await?
            .into_data()
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        self.send(Method::POST, path, &[], Body::json(body)?, token)
            .await?
            .into_data()
    }

    async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        self.send(Method::PUT, path, &[], Body::json(body)?, token)
            .await?
            .into_data()
    }

    /// Send a request whose `data` is irrelevant; returns the backend message.
    async fn acknowledge(
        &self,
        method: Method,
        path: &str,
        body: Body,
        token: Option<&SecretString>,
    ) -> Result<Option<String>, ApiError> {
        let envelope: Envelope<serde_json::Value> =
            self.send(method, path, &[], body, token).await?;
        Ok(envelope.message)
    }

    async fn post_multipart<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: reqwest::multipart::Form,
        token: &SecretString,
    ) -> Result<T, ApiError> {
        self.send(method, path, &[], Body::Multipart(form), Some(token))
            .await?
            .into_data()
    }
}

/// Map a backend status and body onto an envelope or an error.
fn interpret<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    authenticated: bool,
    path: &str,
) -> Result<Envelope<T>, ApiError> {
    if !status.is_success() {
        let message = serde_json::from_str::<Envelope<serde_json::Value>>(body)
            .ok()
            .and_then(|e| e.message)
            .filter(|m| !m.trim().is_empty());

        if status == StatusCode::UNAUTHORIZED && authenticated {
            return Err(ApiError::SessionExpired);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(message.unwrap_or_else(|| path.to_string())));
        }

        tracing::warn!(
            status = %status,
            path,
            body = %body.chars().take(500).collect::<String>(),
            "Backend returned non-success status"
        );
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| format!("Request failed ({status})")),
        });
    }

    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            path,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        e
    })?;

    if envelope.success == Some(false) {
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: envelope
                .message
                .unwrap_or_else(|| "Request failed".to_string()),
        });
    }
    Ok(envelope)
}

/// Origin that serves backend uploads: the API URL without its `/api` path.
fn asset_origin(api_url: &Url) -> String {
    let trimmed = api_url.as_str().trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_success_envelope() {
        let env: Envelope<Vec<u32>> =
            interpret(StatusCode::OK, r#"{"success":true,"data":[1,2]}"#, false, "/x").unwrap();
        assert_eq!(env.into_data().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_interpret_success_false_is_rejected() {
        let err = interpret::<serde_json::Value>(
            StatusCode::OK,
            r#"{"success":false,"message":"Insufficient stock"}"#,
            true,
            "/orders",
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { status: 200, .. }));
        assert_eq!(err.user_message(), "Insufficient stock");
    }

    #[test]
    fn test_interpret_unauthorized_with_token_expires_session() {
        let err = interpret::<serde_json::Value>(
            StatusCode::UNAUTHORIZED,
            r#"{"success":false,"message":"jwt expired"}"#,
            true,
            "/auth/profile",
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::SessionExpired));
    }

    #[test]
    fn test_interpret_unauthorized_without_token_is_rejection() {
        let err = interpret::<serde_json::Value>(
            StatusCode::UNAUTHORIZED,
            r#"{"success":false,"message":"Invalid email or password"}"#,
            false,
            "/auth/login",
        )
        .unwrap_err();
        assert_eq!(err.user_message(), "Invalid email or password");
    }

    #[test]
    fn test_interpret_not_found() {
        let err =
            interpret::<serde_json::Value>(StatusCode::NOT_FOUND, "", false, "/products/x").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(p) if p == "/products/x"));
    }

    #[test]
    fn test_interpret_error_without_json_body() {
        let err = interpret::<serde_json::Value>(
            StatusCode::BAD_GATEWAY,
            "<html>bad gateway</html>",
            false,
            "/products",
        )
        .unwrap_err();
        assert_eq!(err.user_message(), "Request failed (502 Bad Gateway)");
    }

    #[test]
    fn test_missing_data() {
        let env: Envelope<u32> = interpret(StatusCode::OK, r#"{"success":true}"#, false, "/x").unwrap();
        assert!(matches!(env.into_data(), Err(ApiError::MissingData)));
    }

    #[test]
    fn test_asset_origin_strips_api() {
        let url = Url::parse("http://localhost:5001/api/").unwrap();
        assert_eq!(asset_origin(&url), "http://localhost:5001");
        let url = Url::parse("https://backend.example.com/").unwrap();
        assert_eq!(asset_origin(&url), "https://backend.example.com");
    }
}
