//! Terms acceptance and account type selection.
//!
//! Course terms gate access requests; product terms gate checkout. The
//! forms post back here with a `next` path to return to.

use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::post,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::UserType;

use crate::error::AppError;
use crate::middleware::{RequireAuth, auth::safe_next, set_current_user};
use crate::models::Flash;
use crate::routes::context::set_flash;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AcceptForm {
    /// Checkbox; absent when unticked.
    pub agree: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserTypeForm {
    pub user_type: UserType,
    #[serde(default)]
    pub next: Option<String>,
}

async fn require_agreement(session: &Session, form: &AcceptForm) -> Option<Response> {
    if form.agree.is_some() {
        return None;
    }
    set_flash(session, Flash::error("Please tick the box to accept the terms.")).await;
    Some(Redirect::to(safe_next(form.next.as_deref())).into_response())
}

/// Accept the course terms and conditions.
///
/// # Errors
///
/// Returns an error if the backend call fails.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn accept_course(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AcceptForm>,
) -> Result<Response, AppError> {
    if let Some(response) = require_agreement(&session, &form).await {
        return Ok(response);
    }
    state.api().accept_course_terms(&user.token()).await?;
    set_flash(&session, Flash::success("Course terms accepted.")).await;
    Ok(Redirect::to(safe_next(form.next.as_deref())).into_response())
}

/// Accept the product terms and conditions.
///
/// # Errors
///
/// Returns an error if the backend call fails.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn accept_product(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AcceptForm>,
) -> Result<Response, AppError> {
    if let Some(response) = require_agreement(&session, &form).await {
        return Ok(response);
    }
    state.api().accept_product_terms(&user.token()).await?;
    set_flash(&session, Flash::success("Product terms accepted.")).await;
    Ok(Redirect::to(safe_next(form.next.as_deref())).into_response())
}

/// Record whether the user is a student or a business owner.
///
/// # Errors
///
/// Returns an error if the backend call or session update fails.
#[instrument(skip_all, fields(user_id = %user.id, user_type = form.user_type.as_str()))]
pub async fn set_user_type(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(mut user): RequireAuth,
    Form(form): Form<UserTypeForm>,
) -> Result<Response, AppError> {
    let token = user.token();
    state.api().set_user_type(&token, form.user_type).await?;

    // Refresh the session copy so nav and gates see the new type.
    match state.api().profile(&token).await {
        Ok(profile) => {
            user.refresh(&profile);
            set_current_user(&session, &user).await?;
        }
        Err(e) => tracing::warn!("Failed to refresh profile after user type change: {e}"),
    }

    set_flash(&session, Flash::success("Account type saved.")).await;
    Ok(Redirect::to(safe_next(form.next.as_deref())).into_response())
}

/// Create the terms routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/terms/course/accept", post(accept_course))
        .route("/terms/product/accept", post(accept_product))
        .route("/terms/user-type", post(set_user_type))
}
