//! Course access request review.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::CourseRequestId;

use crate::api::{ApproveCourseRequest, RequestPage};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

use super::finish;

/// Status tabs on the request list.
const STATUSES: [&str; 3] = ["pending", "approved", "rejected"];

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RequestListQuery {
    pub status: String,
    pub page: u32,
}

impl Default for RequestListQuery {
    fn default() -> Self {
        Self {
            status: "pending".to_string(),
            page: 1,
        }
    }
}

impl RequestListQuery {
    /// The status filter; empty or unknown means all.
    fn status(&self) -> Option<&str> {
        STATUSES.iter().copied().find(|s| *s == self.status)
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/requests.html")]
pub struct RequestsTemplate {
    pub ctx: PageContext,
    pub requests: RequestPage,
    /// Selected tab; empty for all.
    pub status: String,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
}

/// List course requests by status.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, ctx, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<RequestListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = query.status();
    let requests = or_default(
        state
            .api()
            .admin_requests(&admin.token(), query.page.max(1), status)
            .await,
        "course requests",
    )?;

    let page = requests.pagination.page.max(1);
    Ok(RequestsTemplate {
        ctx,
        prev_page: (page > 1).then(|| page - 1),
        next_page: (page < requests.pagination.pages).then(|| page + 1),
        requests,
        status: status.unwrap_or_default().to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApproveForm {
    pub admin_notes: String,
}

/// Grant course access.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn approve(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CourseRequestId>,
    Form(form): Form<ApproveForm>,
) -> Result<Response, AppError> {
    let approval = ApproveCourseRequest {
        admin_notes: Some(form.admin_notes.trim().to_string()).filter(|n| !n.is_empty()),
    };
    let result = state
        .api()
        .approve_course_request(&admin.token(), &id, &approval)
        .await
        .map(|request| tracing::info!(course = %request.course_id, "Course request approved"));
    finish(&session, result, "Request approved.", "/admin/requests").await
}

/// Refuse course access.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn reject(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CourseRequestId>,
) -> Result<Response, AppError> {
    let result = state
        .api()
        .reject_course_request(&admin.token(), &id)
        .await
        .map(|request| tracing::info!(course = %request.course_id, "Course request rejected"));
    finish(&session, result, "Request rejected.", "/admin/requests").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter() {
        assert_eq!(RequestListQuery::default().status(), Some("pending"));
        let all = RequestListQuery {
            status: String::new(),
            page: 1,
        };
        assert_eq!(all.status(), None);
        let bogus = RequestListQuery {
            status: "archived".to_string(),
            page: 1,
        };
        assert_eq!(bogus.status(), None);
    }
}
