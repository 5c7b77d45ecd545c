//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /about                  - About page
//! GET  /terms/courses          - Course terms
//! GET  /terms/products         - Product terms
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (backend reachable)
//! GET  /sw.js                  - Push service worker
//!
//! # Courses
//! GET  /courses                - Course catalog
//! GET  /courses/{slug}         - Course player (?v=index)
//! POST /courses/{slug}/videos/{index}/watched - Mark watched, unlock next
//! POST /courses/{slug}/request - Request access
//!
//! # Terms
//! POST /terms/course/accept    - Accept course terms
//! POST /terms/product/accept   - Accept product terms
//! POST /terms/user-type        - Choose student / business owner
//!
//! # Blog
//! GET  /blog                   - Posts (?q=, ?offset= returns a fragment for HTMX)
//! GET  /blog/{slug}            - Post
//!
//! # Shop
//! GET  /shop                   - Products (?q=, ?c0..c3= category levels, ?type=)
//! GET  /shop/{slug}            - Product detail
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns badge, triggers cart-updated)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove line (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout               - Shipping form
//! POST /checkout               - Place order, open payment page
//! POST /checkout/verify        - Payment callback
//!
//! # Auth
//! GET  /auth/login             - Login page (?next=, ?expired=1)
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//! GET  /auth/forgot-password   - Forgot password page
//! POST /auth/forgot-password   - Send reset email
//! GET  /auth/reset-password    - Reset form (?token=)
//! POST /auth/reset-password    - Set new password
//!
//! # Account (requires auth)
//! GET  /account                - Profile
//! POST /account                - Update profile
//! GET  /account/orders         - Order history
//! GET  /account/downloads      - Digital downloads
//! GET  /account/courses        - Enrolled courses and access requests
//!
//! # KYC (requires auth)
//! GET  /kyc/product            - Product KYC form and status
//! POST /kyc/product            - Submit product KYC (multipart)
//! POST /kyc/business-upgrade   - Student to business owner (multipart)
//!
//! # Notifications (requires auth)
//! GET  /notifications          - List
//! POST /notifications/{id}/read
//! POST /notifications/read-all
//!
//! # JSON API
//! POST /api/push/subscribe     - Register a push subscription
//! POST /api/push/unsubscribe   - Remove a push subscription
//!
//! # Admin (requires admin role), see [`admin`]
//! ```

pub mod account;
pub mod admin;
pub mod api;
pub mod auth;
pub mod blog;
pub mod cart;
pub mod checkout;
pub mod context;
pub mod courses;
pub mod home;
pub mod kyc;
pub mod notifications;
pub mod pages;
pub mod shop;
pub mod terms;
pub mod uploads;

pub use context::PageContext;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use crate::api::ApiError;
use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Service worker script, served from the site root so its scope is `/`.
const SERVICE_WORKER: &str = include_str!("../../static/sw.js");

/// Treat a failed secondary backend call as empty.
///
/// An expired session still propagates so the user is signed out.
pub(crate) fn or_default<T: Default>(result: Result<T, ApiError>, what: &str) -> Result<T, AppError> {
    match result {
        Ok(value) => Ok(value),
        Err(ApiError::SessionExpired) => Err(AppError::Api(ApiError::SessionExpired)),
        Err(e) => {
            tracing::warn!("Failed to fetch {what}: {e}");
            Ok(T::default())
        }
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the backend is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.api().ping().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn service_worker() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("service-worker-allowed"), "/"),
        ],
        SERVICE_WORKER,
    )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let auth = match auth_rate_limiter() {
        Some(limiter) => auth::router().layer(limiter),
        None => auth::router(),
    };
    let (api, cart) = match api_rate_limiter() {
        Some(limiter) => (api::router().layer(limiter.clone()), cart::router().layer(limiter)),
        None => (api::router(), cart::router()),
    };

    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/sw.js", get(service_worker))
        .merge(pages::router())
        .merge(terms::router())
        .nest("/courses", courses::router())
        .nest("/blog", blog::router())
        .nest("/shop", shop::router())
        .nest("/cart", cart)
        .nest("/checkout", checkout::router())
        .nest("/auth", auth)
        .nest("/account", account::router())
        .nest("/kyc", kyc::router())
        .nest("/notifications", notifications::router())
        .nest("/api", api)
        .nest("/admin", admin::router())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_default_swallows_backend_failures() {
        let result: Result<Vec<u8>, _> = or_default(Err(ApiError::MissingData), "things");
        assert!(matches!(result, Ok(v) if v.is_empty()));
    }

    #[test]
    fn test_or_default_keeps_session_expiry() {
        let result: Result<Vec<u8>, _> = or_default(Err(ApiError::SessionExpired), "things");
        assert!(matches!(result, Err(AppError::Api(ApiError::SessionExpired))));
    }
}
