//! Security headers middleware.
//!
//! Headers applied to every response:
//! - `Content-Security-Policy` built per request (nonce, backend origin)
//! - `X-Frame-Options: DENY`
//! - `X-Content-Type-Options: nosniff`
//! - `Referrer-Policy: strict-origin-when-cross-origin` (YouTube embeds need
//!   the origin)
//! - `Permissions-Policy` allowing only what video playback and Razorpay use
//! - `Cross-Origin-Opener-Policy: same-origin-allow-popups` (Razorpay opens
//!   bank pages in popups)
//! - `Cache-Control: no-store` on HTML, since pages embed session data

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, CONTENT_TYPE, REFERRER_POLICY,
            X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::csp::{CspNonce, content_security_policy};
use crate::state::AppState;

const PERMISSIONS_POLICY: &str = "accelerometer=(), \
     autoplay=(self \"https://www.youtube.com\" \"https://www.youtube-nocookie.com\"), \
     camera=(), \
     encrypted-media=(self \"https://www.youtube.com\" \"https://www.youtube-nocookie.com\"), \
     fullscreen=(self \"https://www.youtube.com\" \"https://www.youtube-nocookie.com\"), \
     geolocation=(), \
     gyroscope=(), \
     magnetometer=(), \
     microphone=(), \
     payment=(self \"https://api.razorpay.com\" \"https://checkout.razorpay.com\"), \
     picture-in-picture=(self \"https://www.youtube.com\" \"https://www.youtube-nocookie.com\"), \
     usb=()";

/// Add security headers to all responses.
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let nonce = request.extensions().get::<CspNonce>().cloned();
    let mut response = next.run(request).await;

    let asset_origin = state.api().asset_url("");
    let csp = content_security_policy(
        nonce.as_ref().map(CspNonce::value),
        asset_origin.trim_end_matches('/'),
    );

    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));

    let headers = response.headers_mut();

    match HeaderValue::from_str(&csp) {
        Ok(value) => {
            headers.insert(CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => tracing::error!("Invalid CSP header value: {e}"),
    }

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(PERMISSIONS_POLICY),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin-allow-popups"),
    );

    if is_html {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    response
}
