//! Authentication extractors and session expiry handling.
//!
//! The signed-in user (with their backend token) lives in the session under
//! [`session_keys::CURRENT_USER`]. Extractors read it; handlers never touch
//! the session key directly.

use axum::{
    extract::{FromRequestParts, OriginalUri, Request},
    http::{HeaderValue, StatusCode, Uri, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{AppError, SessionExpired};
use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// Page requests are redirected to the login form with a `next` parameter
/// pointing back at the original URL.
///
/// ```rust,ignore
/// async fn orders(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub CurrentUser);

/// Error returned when authentication is required but missing.
pub enum AuthRejection {
    /// Redirect to the login page, returning to this path afterwards.
    RedirectToLogin(String),
    /// HTMX request: tell htmx to navigate to the login page.
    HxRedirect(String),
    /// Unauthorized response (for JSON API requests).
    Unauthorized,
    /// Signed in, but not an admin.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(next) => Redirect::to(&login_url(&next)).into_response(),
            Self::HxRedirect(next) => {
                let mut response = StatusCode::OK.into_response();
                if let Ok(value) = HeaderValue::from_str(&login_url(&next)) {
                    response.headers_mut().insert("HX-Redirect", value);
                }
                response
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => AppError::Forbidden("admin role required".to_string()).into_response(),
        }
    }
}

/// Login URL that returns to `next` after signing in.
#[must_use]
pub fn login_url(next: &str) -> String {
    if next.is_empty() || next == "/" {
        "/auth/login".to_string()
    } else {
        format!("/auth/login?next={}", urlencoding::encode(next))
    }
}

/// Only same-site relative paths are accepted as post-login targets.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

/// The URI as the client sent it. Nested routers see `parts.uri` with their
/// prefix stripped.
#[must_use]
pub fn request_uri(parts: &Parts) -> &Uri {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0)
}

fn rejection_for(parts: &Parts) -> AuthRejection {
    let uri = request_uri(parts);
    let path = uri.path();
    if path.starts_with("/api/") {
        return AuthRejection::Unauthorized;
    }

    let next = uri
        .path_and_query()
        .map_or_else(|| path.to_string(), |pq| pq.as_str().to_string());
    let next = if parts.method == axum::http::Method::GET {
        next
    } else {
        // Re-posting after login makes no sense; send them back to a page.
        parts
            .headers
            .get("HX-Current-URL")
            .and_then(|v| v.to_str().ok())
            .and_then(|url| url::Url::parse(url).ok())
            .map_or_else(|| "/".to_string(), |url| url.path().to_string())
    };

    if parts.headers.contains_key("HX-Request") {
        AuthRejection::HxRedirect(next)
    } else {
        AuthRejection::RedirectToLogin(next)
    }
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await
            .map(Self)
            .ok_or_else(|| rejection_for(parts))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts).await.ok_or_else(|| rejection_for(parts))?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %request_uri(parts).path(), "Non-admin hit admin route");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Store the signed-in user in the session.
///
/// The session ID is cycled first so a pre-login ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the signed-in user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

/// Drops the session user when a handler reports that the backend rejected
/// their token.
pub async fn session_expiry_middleware(session: Session, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.extensions().get::<SessionExpired>().is_some() {
        if let Err(e) = clear_current_user(&session).await {
            tracing::error!("Failed to clear expired session user: {e}");
        }
        crate::error::clear_sentry_user();
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{Method, Request as HttpRequest};

    /// Parts as a handler nested under `/prefix` sees them: `uri` stripped,
    /// the full path kept in `OriginalUri`.
    fn nested_parts(method: Method, original: &str, stripped: &str) -> Parts {
        let (mut parts, ()) = HttpRequest::builder()
            .method(method)
            .uri(stripped)
            .body(())
            .unwrap()
            .into_parts();
        parts
            .extensions
            .insert(OriginalUri(original.parse().unwrap()));
        parts
    }

    fn login_target(rejection: AuthRejection) -> Option<String> {
        match rejection {
            AuthRejection::RedirectToLogin(next) | AuthRejection::HxRedirect(next) => Some(next),
            AuthRejection::Unauthorized | AuthRejection::Forbidden => None,
        }
    }

    #[test]
    fn test_nested_page_keeps_full_return_path() {
        let parts = nested_parts(Method::GET, "/account/orders?page=2", "/orders?page=2");
        assert_eq!(
            login_target(rejection_for(&parts)).as_deref(),
            Some("/account/orders?page=2")
        );

        let parts = nested_parts(Method::GET, "/checkout", "/");
        assert_eq!(login_target(rejection_for(&parts)).as_deref(), Some("/checkout"));
    }

    #[test]
    fn test_nested_json_api_is_unauthorized() {
        let parts = nested_parts(Method::POST, "/api/push/subscribe", "/push/subscribe");
        assert!(matches!(rejection_for(&parts), AuthRejection::Unauthorized));
    }

    #[test]
    fn test_request_uri_without_original_falls_back() {
        let (parts, ()) = HttpRequest::builder()
            .uri("/notifications")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(request_uri(&parts).path(), "/notifications");
    }

    #[test]
    fn test_login_url() {
        assert_eq!(login_url("/"), "/auth/login");
        assert_eq!(login_url("/checkout"), "/auth/login?next=%2Fcheckout");
        assert_eq!(
            login_url("/shop?q=obd scanner"),
            "/auth/login?next=%2Fshop%3Fq%3Dobd%20scanner"
        );
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/account/orders")), "/account/orders");
        assert_eq!(safe_next(Some("//evil.example.com")), "/");
        assert_eq!(safe_next(Some("https://evil.example.com")), "/");
        assert_eq!(safe_next(Some("/\\evil.example.com")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
