//! Site-wide announcements.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{Announcement, AnnouncementKind, Audience, NewAnnouncement};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::routes::context::set_flash;
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

use super::finish;

#[derive(Template, WebTemplate)]
#[template(path = "admin/announcements.html")]
pub struct AnnouncementsTemplate {
    pub ctx: PageContext,
    pub announcements: Vec<Announcement>,
    pub kinds: [AnnouncementKind; 4],
    pub audiences: [Audience; 3],
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: AnnouncementKind,
    #[serde(default)]
    pub target_audience: Audience,
}

impl AnnouncementForm {
    fn into_request(self) -> Result<NewAnnouncement, &'static str> {
        let title = self.title.trim().to_string();
        let message = self.message.trim().to_string();
        if title.is_empty() || message.is_empty() {
            return Err("Title and message are required");
        }
        Ok(NewAnnouncement {
            title,
            message,
            kind: self.kind,
            target_audience: self.target_audience,
        })
    }
}

/// List announcements.
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
    let announcements = or_default(
        state.api().admin_announcements(&admin.token(), None).await,
        "announcements",
    )?;
    Ok(AnnouncementsTemplate {
        ctx,
        announcements,
        kinds: [
            AnnouncementKind::Info,
            AnnouncementKind::Success,
            AnnouncementKind::Warning,
            AnnouncementKind::Error,
        ],
        audiences: [Audience::All, Audience::Users, Audience::Admins],
    })
}

/// Publish an announcement.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<AnnouncementForm>,
) -> Result<Response, AppError> {
    let announcement = match form.into_request() {
        Ok(announcement) => announcement,
        Err(message) => {
            set_flash(&session, Flash::error(message)).await;
            return Ok(Redirect::to("/admin/announcements").into_response());
        }
    };
    let result = state
        .api()
        .admin_create_announcement(&admin.token(), &announcement)
        .await;
    finish(&session, result, "Announcement published.", "/admin/announcements").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_announcement_rejected() {
        let form = AnnouncementForm {
            title: "  ".to_string(),
            message: "Workshop closed Monday".to_string(),
            kind: AnnouncementKind::Info,
            target_audience: Audience::All,
        };
        assert!(form.into_request().is_err());
    }

    #[test]
    fn test_announcement_trimmed() {
        let form = AnnouncementForm {
            title: " Holiday hours ".to_string(),
            message: "Closed on Onam".to_string(),
            kind: AnnouncementKind::Warning,
            target_audience: Audience::Users,
        };
        let request = form.into_request().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(request.title, "Holiday hours");
        assert_eq!(request.target_audience, Audience::Users);
    }
}
