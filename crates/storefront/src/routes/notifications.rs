//! In-app notification list.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::NotificationId;

use crate::api::{ApiError, NotificationList};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::middleware::auth::safe_next;
use crate::models::Flash;
use crate::routes::context::set_flash;
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

/// Notifications shown per page.
const PAGE_SIZE: u32 = 50;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotificationQuery {
    /// Only unread notifications.
    pub unread: bool,
}

/// Where to go after marking one read.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReadForm {
    pub next: Option<String>,
}

/// Notification list template.
#[derive(Template, WebTemplate)]
#[template(path = "notifications/index.html")]
pub struct NotificationsTemplate {
    pub ctx: PageContext,
    pub list: NotificationList,
    pub unread_only: bool,
}

/// Display notifications, newest first.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let list = or_default(
        state
            .api()
            .notifications(&user.token(), PAGE_SIZE, 0, query.unread)
            .await,
        "notifications",
    )?;
    Ok(NotificationsTemplate {
        ctx,
        list,
        unread_only: query.unread,
    })
}

/// Mark one notification read, then follow its link if it has one.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NotificationId>,
    Form(form): Form<ReadForm>,
) -> Result<Response, AppError> {
    match state.api().mark_notification_read(&user.token(), &id).await {
        Ok(()) => {}
        Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
        Err(e) => tracing::warn!("Failed to mark notification read: {e}"),
    }
    let next = form
        .next
        .as_deref()
        .map_or("/notifications", |next| safe_next(Some(next)));
    Ok(Redirect::to(next).into_response())
}

/// Mark every notification read.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    match state.api().mark_all_notifications_read(&user.token()).await {
        Ok(()) => set_flash(&session, Flash::success("All notifications marked as read.")).await,
        Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
        Err(e) => {
            tracing::warn!("Failed to mark notifications read: {e}");
            set_flash(&session, Flash::error(e.user_message())).await;
        }
    }
    Ok(Redirect::to("/notifications").into_response())
}

/// Create the notification routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{id}/read", post(mark_read))
        .route("/read-all", post(mark_all_read))
}
