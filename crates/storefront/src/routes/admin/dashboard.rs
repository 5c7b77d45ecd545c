//! Admin dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use diag_wheels_core::RequestStatus;

use crate::api::{CourseRequest, DashboardStats};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

/// Pending requests listed on the dashboard.
const RECENT_PENDING: usize = 5;

#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub stats: DashboardStats,
    pub pending: Vec<CourseRequest>,
}

/// Oldest pending requests first, so nothing waits forever.
fn oldest_pending(mut requests: Vec<CourseRequest>) -> Vec<CourseRequest> {
    requests.retain(|r| r.status == RequestStatus::Pending);
    requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    requests.truncate(RECENT_PENDING);
    requests
}

/// Display headline counts and the request queue.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let token = admin.token();
    let (stats, requests) = tokio::join!(
        state.api().admin_dashboard(&token),
        state.api().admin_all_course_requests(&token)
    );
    Ok(DashboardTemplate {
        ctx,
        stats: or_default(stats, "dashboard stats")?,
        pending: oldest_pending(or_default(requests, "course requests")?),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(id: &str, status: &str, created_at: &str) -> CourseRequest {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "course_id": "diagnostic-tools",
            "status": status,
            "created_at": created_at,
        }))
        .unwrap()
    }

    #[test]
    fn test_oldest_pending_first() {
        let queue = oldest_pending(vec![
            request("r1", "pending", "2024-03-02T10:00:00Z"),
            request("r2", "approved", "2024-03-01T10:00:00Z"),
            request("r3", "pending", "2024-03-01T09:00:00Z"),
        ]);
        let ids: Vec<&str> = queue.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r3", "r1"]);
    }
}
