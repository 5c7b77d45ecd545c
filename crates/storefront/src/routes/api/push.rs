//! Web push registration.
//!
//! `static/js/push.js` asks the browser for a subscription with the
//! configured VAPID key and posts it here; the backend does the delivery.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::{ApiError, PushSubscription};
use crate::middleware::RequireAuth;
use crate::state::AppState;

use super::JsonError;

/// Body of a successful call.
#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub success: bool,
}

/// Unsubscribe request.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

fn backend_error(e: &ApiError) -> JsonError {
    match e {
        ApiError::SessionExpired => JsonError::new(StatusCode::UNAUTHORIZED, e.user_message()),
        ApiError::RateLimited(_) => JsonError::new(StatusCode::TOO_MANY_REQUESTS, e.user_message()),
        ApiError::Rejected { .. } => JsonError::bad_request(e.user_message()),
        _ => JsonError::new(StatusCode::BAD_GATEWAY, e.user_message()),
    }
}

/// Register a push subscription for the signed-in user.
///
/// POST /api/push/subscribe
///
/// # Errors
///
/// Returns `JsonError` if the subscription is incomplete or the backend
/// refuses it.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn subscribe(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(subscription): Json<PushSubscription>,
) -> Result<Json<PushResponse>, JsonError> {
    if subscription.endpoint.trim().is_empty()
        || subscription.keys.p256dh.is_empty()
        || subscription.keys.auth.is_empty()
    {
        return Err(JsonError::bad_request("Subscription is missing its endpoint or keys"));
    }

    state
        .api()
        .push_subscribe(&user.token(), &subscription)
        .await
        .map_err(|e| {
            tracing::warn!("Push subscribe failed: {e}");
            backend_error(&e)
        })?;
    tracing::info!("Push subscription registered");
    Ok(Json(PushResponse { success: true }))
}

/// Remove a push subscription.
///
/// POST /api/push/unsubscribe
///
/// # Errors
///
/// Returns `JsonError` if the backend refuses.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<Json<PushResponse>, JsonError> {
    state
        .api()
        .push_unsubscribe(&user.token(), &request.endpoint)
        .await
        .map_err(|e| {
            tracing::warn!("Push unsubscribe failed: {e}");
            backend_error(&e)
        })?;
    Ok(Json(PushResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_status() {
        assert_eq!(backend_error(&ApiError::SessionExpired).status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            backend_error(&ApiError::Rejected {
                status: 422,
                message: "bad keys".to_string()
            })
            .error,
            "bad keys"
        );
        assert_eq!(backend_error(&ApiError::MissingData).status, StatusCode::BAD_GATEWAY);
    }
}
