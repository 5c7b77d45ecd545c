//! Per-request CSP nonce and the Content-Security-Policy it feeds.
//!
//! Inline scripts (the Razorpay hand-off, push opt-in bootstrap) carry
//! `nonce="{{ ctx.nonce }}"`; everything else is loaded from `/static` or
//! an allow-listed origin.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;

/// External script origins: htmx and Razorpay Checkout.
const SCRIPT_ORIGINS: &str = "https://unpkg.com https://checkout.razorpay.com";

/// Frames: course videos and the Razorpay payment sheet.
const FRAME_ORIGINS: &str = "https://www.youtube.com https://www.youtube-nocookie.com \
                             https://api.razorpay.com https://checkout.razorpay.com";

/// A CSP nonce value for inline scripts (128-bit, base64-encoded).
#[derive(Clone, Debug)]
pub struct CspNonce(pub String);

impl CspNonce {
    /// Generate a new random nonce.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Middleware that generates a CSP nonce and stores it in request extensions.
///
/// Must run before `security_headers_middleware`, which reads the nonce back
/// when writing the header.
pub async fn csp_nonce_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(CspNonce::generate());
    next.run(request).await
}

impl<S> FromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!(
                "CSP nonce not found in request extensions - middleware may be misconfigured"
            );
            Self(String::new())
        }))
    }
}

/// Build the policy for one response.
///
/// `asset_origin` is the backend origin serving uploaded images and
/// documents (often plain `http://` in development).
#[must_use]
pub fn content_security_policy(nonce: Option<&str>, asset_origin: &str) -> String {
    let nonce_src = nonce
        .filter(|n| !n.is_empty())
        .map(|n| format!(" 'nonce-{n}'"))
        .unwrap_or_default();

    format!(
        "default-src 'self'; \
         script-src 'self'{nonce_src} {SCRIPT_ORIGINS}; \
         style-src 'self' 'unsafe-inline'; \
         img-src 'self' data: https: {asset_origin}; \
         font-src 'self' data:; \
         connect-src 'self' https://*.razorpay.com https://lumberjack.razorpay.com; \
         frame-src {FRAME_ORIGINS}; \
         media-src 'self' {asset_origin}; \
         worker-src 'self'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonces_are_unique() {
        let a = CspNonce::generate();
        let b = CspNonce::generate();
        assert_ne!(a.value(), b.value());
        assert_eq!(a.value().len(), 24);
    }

    #[test]
    fn test_policy_includes_nonce_and_origins() {
        let csp = content_security_policy(Some("abc"), "http://localhost:5001");
        assert!(csp.contains("script-src 'self' 'nonce-abc' https://unpkg.com"));
        assert!(csp.contains("https://checkout.razorpay.com"));
        assert!(csp.contains("https://www.youtube.com"));
        assert!(csp.contains("img-src 'self' data: https: http://localhost:5001"));
    }

    #[test]
    fn test_policy_without_nonce() {
        let csp = content_security_policy(None, "https://api.example.com");
        assert!(!csp.contains("nonce-"));
    }
}
