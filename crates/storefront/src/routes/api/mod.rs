//! JSON API routes called from page scripts.
//!
//! Unauthenticated requests get a bare 401 instead of a login redirect.

pub mod push;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;

use crate::state::AppState;

/// Error body for JSON endpoints.
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub error: String,
    #[serde(skip)]
    status: StatusCode,
}

impl JsonError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Create the JSON API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/push/subscribe", post(push::subscribe))
        .route("/push/unsubscribe", post(push::unsubscribe))
}
