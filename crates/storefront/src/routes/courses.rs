//! Course catalog, player and access requests.
//!
//! Course content is static (see [`crate::content`]); enrollment, access
//! requests and per-video progress come from the backend. A user may watch a
//! course once they are enrolled or an access request was approved.
//! Lessons unlock in order: the first is always open, each later one opens
//! when the backend marks it unlocked or the one before it was watched.

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

use diag_wheels_core::RequestStatus;

use crate::api::{ApiError, CourseProgress, CourseRequest, CreateCourseRequest, EnrolledCourse};
use crate::content::Course;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Flash};
use crate::routes::context::set_flash;
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

/// Where the signed-in user stands with a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseStatus {
    /// Not signed in.
    Guest,
    /// Signed in, may request access.
    Available,
    /// Request awaiting review.
    Pending,
    /// Last request was turned down; may ask again.
    Rejected,
    /// Enrolled or request approved.
    Enrolled,
}

impl CourseStatus {
    #[must_use]
    pub const fn has_access(self) -> bool {
        matches!(self, Self::Enrolled)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Guest | Self::Available => "",
            Self::Pending => "Request pending",
            Self::Rejected => "Request declined",
            Self::Enrolled => "Enrolled",
        }
    }

    #[must_use]
    pub const fn can_request(self) -> bool {
        matches!(self, Self::Available | Self::Rejected)
    }

    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub const fn is_rejected(self) -> bool {
        matches!(self, Self::Rejected)
    }

    #[must_use]
    pub const fn is_guest(self) -> bool {
        matches!(self, Self::Guest)
    }
}

/// Status of `slug` given the user's enrollments and requests.
///
/// An approved request wins over a pending one, which wins over a rejection.
#[must_use]
pub fn course_status(slug: &str, enrolled: &[EnrolledCourse], requests: &[CourseRequest]) -> CourseStatus {
    if enrolled.iter().any(|e| e.course_id == slug) {
        return CourseStatus::Enrolled;
    }
    let mut status = CourseStatus::Available;
    for request in requests.iter().filter(|r| r.course_id == slug) {
        match request.status {
            RequestStatus::Approved => return CourseStatus::Enrolled,
            RequestStatus::Pending => status = CourseStatus::Pending,
            RequestStatus::Rejected if status == CourseStatus::Available => {
                status = CourseStatus::Rejected;
            }
            RequestStatus::Rejected => {}
        }
    }
    status
}

/// One lesson in the player sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub index: usize,
    pub title: String,
    pub unlocked: bool,
    pub watched: bool,
    /// Shown in the player right now.
    pub playing: bool,
}

/// Lock state of every lesson in `course`.
#[must_use]
pub fn lessons(course: &Course, progress: &CourseProgress) -> Vec<Lesson> {
    let mut previous_watched = true;
    course
        .videos
        .iter()
        .map(|video| {
            let record = progress.video(&video.id);
            let watched = record.is_some_and(|p| p.is_watched);
            let unlocked = previous_watched || watched || record.is_some_and(|p| p.is_unlocked);
            previous_watched = watched;
            Lesson {
                index: video.index,
                title: video.title.clone(),
                unlocked,
                watched,
                playing: false,
            }
        })
        .collect()
}

/// Lessons as shown to someone without access: all locked.
fn locked_lessons(course: &Course) -> Vec<Lesson> {
    course
        .videos
        .iter()
        .map(|video| Lesson {
            index: video.index,
            title: video.title.clone(),
            unlocked: false,
            watched: false,
            playing: false,
        })
        .collect()
}

/// A catalog card.
#[derive(Clone)]
pub struct CourseCard {
    pub course: Course,
    pub status: CourseStatus,
}

/// Enrollments and requests for the signed-in user, or nothing for guests.
async fn standing(
    state: &AppState,
    user: Option<&CurrentUser>,
) -> Result<(Vec<EnrolledCourse>, Vec<CourseRequest>), AppError> {
    let Some(user) = user else {
        return Ok((Vec::new(), Vec::new()));
    };
    let token = user.token();
    let (enrolled, requests) = tokio::join!(
        state.api().my_courses(&token),
        state.api().my_course_requests(&token)
    );
    Ok((
        or_default(enrolled, "enrolled courses")?,
        or_default(requests, "course requests")?,
    ))
}

fn status_for(user: Option<&CurrentUser>, slug: &str, enrolled: &[EnrolledCourse], requests: &[CourseRequest]) -> CourseStatus {
    match user {
        None => CourseStatus::Guest,
        Some(user) if user.is_admin() => CourseStatus::Enrolled,
        Some(_) => course_status(slug, enrolled, requests),
    }
}

fn find_course<'a>(state: &'a AppState, slug: &str) -> Result<&'a Course, AppError> {
    state
        .content()
        .get_course(slug)
        .ok_or_else(|| AppError::NotFound(format!("course {slug}")))
}

// =============================================================================
// Catalog
// =============================================================================

/// Course catalog template.
#[derive(Template, WebTemplate)]
#[template(path = "courses/index.html")]
pub struct CoursesIndexTemplate {
    pub ctx: PageContext,
    pub cards: Vec<CourseCard>,
}

/// Display the course catalog.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, ctx))]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> Result<impl IntoResponse, AppError> {
    let (enrolled, requests) = standing(&state, ctx.user.as_ref()).await?;
    let cards = state
        .content()
        .courses()
        .iter()
        .map(|course| CourseCard {
            status: status_for(ctx.user.as_ref(), &course.slug, &enrolled, &requests),
            course: course.clone(),
        })
        .collect();

    Ok(CoursesIndexTemplate { ctx, cards })
}

// =============================================================================
// Player
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PlayerQuery {
    pub v: Option<usize>,
}

/// Course player template.
#[derive(Template, WebTemplate)]
#[template(path = "courses/show.html")]
pub struct CourseShowTemplate {
    pub ctx: PageContext,
    pub course: Course,
    pub status: CourseStatus,
    pub lessons: Vec<Lesson>,
    /// Index of the lesson being played, when it is unlocked.
    pub current: Option<usize>,
    /// The requested lesson exists but is still locked.
    pub requested_locked: bool,
    pub course_terms_accepted: bool,
    pub completed: usize,
    pub percent: usize,
}

impl CourseShowTemplate {
    /// Lesson being played.
    #[must_use]
    pub fn current_video(&self) -> Option<&crate::content::Video> {
        self.current.and_then(|index| self.course.video(index))
    }

    /// Index of the lesson after the current one, if any.
    #[must_use]
    pub fn next_index(&self) -> Option<usize> {
        self.current
            .map(|index| index + 1)
            .filter(|next| *next < self.course.videos.len())
    }

    #[must_use]
    pub fn current_watched(&self) -> bool {
        self.current
            .and_then(|index| self.lessons.get(index))
            .is_some_and(|lesson| lesson.watched)
    }
}

/// Display a course: lesson list, player and access controls.
///
/// # Errors
///
/// Returns 404 for an unknown course.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
    Query(query): Query<PlayerQuery>,
) -> Result<impl IntoResponse, AppError> {
    let course = find_course(&state, &slug)?.clone();
    let (enrolled, requests) = standing(&state, ctx.user.as_ref()).await?;
    let status = status_for(ctx.user.as_ref(), &slug, &enrolled, &requests);

    let mut course_terms_accepted = true;
    let mut lessons = match (&ctx.user, status.has_access()) {
        (Some(user), true) => {
            let progress = or_default(
                state.api().course_progress(&user.token(), &slug).await,
                "course progress",
            )?;
            lessons(&course, &progress)
        }
        (Some(user), false) => {
            let terms = or_default(state.api().terms_status(&user.token()).await, "terms status")?;
            course_terms_accepted = terms.course_terms_accepted;
            locked_lessons(&course)
        }
        (None, _) => locked_lessons(&course),
    };

    let wanted = query.v.unwrap_or_else(|| {
        // Resume at the first unwatched unlocked lesson.
        lessons
            .iter()
            .find(|l| l.unlocked && !l.watched)
            .or_else(|| lessons.first())
            .map_or(0, |l| l.index)
    });
    let wanted_lesson = lessons.get(wanted);
    let current = wanted_lesson.filter(|l| l.unlocked).map(|l| l.index);
    let requested_locked = wanted_lesson.is_some_and(|l| !l.unlocked) && status.has_access();
    if let Some(lesson) = current.and_then(|index| lessons.get_mut(index)) {
        lesson.playing = true;
    }

    let completed = lessons.iter().filter(|l| l.watched).count();
    let percent = if lessons.is_empty() {
        0
    } else {
        completed * 100 / lessons.len()
    };

    Ok(CourseShowTemplate {
        ctx,
        course,
        status,
        lessons,
        current,
        requested_locked,
        course_terms_accepted,
        completed,
        percent,
    })
}

/// Record a finished lesson and unlock the one after it.
///
/// # Errors
///
/// Returns 404 for an unknown course or lesson, 403 without access.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn watched(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path((slug, index)): Path<(String, usize)>,
) -> Result<Response, AppError> {
    let course = find_course(&state, &slug)?;
    let video = course
        .video(index)
        .ok_or_else(|| AppError::NotFound(format!("lesson {index} of {slug}")))?;

    let (enrolled, requests) = standing(&state, Some(&user)).await?;
    if !status_for(Some(&user), &slug, &enrolled, &requests).has_access() {
        return Err(AppError::Forbidden(format!("no access to {slug}")));
    }

    let token = user.token();
    let progress = or_default(state.api().course_progress(&token, &slug).await, "course progress")?;
    let unlocked = lessons(course, &progress)
        .get(index)
        .is_some_and(|lesson| lesson.unlocked);
    if !unlocked {
        set_flash(&session, Flash::error("Finish the previous lesson first.")).await;
        return Ok(Redirect::to(&format!("/courses/{slug}")).into_response());
    }

    state.api().mark_video_watched(&token, &video.id).await?;

    let next = index + 1;
    if course.video(next).is_some() {
        if let Err(e) = state.api().unlock_next_video(&token, &video.id).await {
            // The next lesson still opens locally because this one is watched.
            tracing::warn!(video_id = %video.id, "Failed to unlock next video: {e}");
        }
        Ok(Redirect::to(&format!("/courses/{slug}?v={next}")).into_response())
    } else {
        set_flash(&session, Flash::success("Course complete. Well done!")).await;
        Ok(Redirect::to(&format!("/courses/{slug}?v={index}")).into_response())
    }
}

// =============================================================================
// Access requests
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AccessRequestForm {
    pub message: String,
}

/// Ask an admin for access to a course.
///
/// Course terms must be accepted first.
///
/// # Errors
///
/// Returns 404 for an unknown course.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn request_access(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(slug): Path<String>,
    Form(form): Form<AccessRequestForm>,
) -> Result<Response, AppError> {
    let course = find_course(&state, &slug)?;
    let back = Redirect::to(&format!("/courses/{slug}"));
    let token = user.token();

    let terms = state.api().terms_status(&token).await?;
    if !terms.course_terms_accepted {
        set_flash(&session, Flash::error("Please accept the course terms before requesting access.")).await;
        return Ok(back.into_response());
    }

    let message = form.message.trim();
    let request = CreateCourseRequest {
        course_id: &course.slug,
        course_name: &course.meta.name,
        message: (!message.is_empty()).then_some(message),
    };

    match state.api().create_course_request(&token, &request).await {
        Ok(_) => {
            tracing::info!(course = %slug, "Course access requested");
            set_flash(
                &session,
                Flash::success("Access request sent. You'll be notified once it's reviewed."),
            )
            .await;
        }
        Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
        Err(e) => set_flash(&session, Flash::error(e.user_message())).await,
    }
    Ok(back.into_response())
}

/// Create the course routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{slug}", get(show))
        .route("/{slug}/videos/{index}/watched", post(watched))
        .route("/{slug}/request", post(request_access))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::VideoProgress;
    use crate::content::ContentStore;
    use serde_json::json;

    fn course() -> Course {
        let store = ContentStore::load(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("content").as_path())
            .unwrap();
        store.get_course("diagnostic-tools").unwrap().clone()
    }

    fn progress(records: &[(&str, bool, bool)]) -> CourseProgress {
        CourseProgress {
            videos: records
                .iter()
                .map(|(id, watched, unlocked)| VideoProgress {
                    video_id: (*id).to_string(),
                    is_watched: *watched,
                    is_unlocked: *unlocked,
                    watched_at: None,
                })
                .collect(),
            ..CourseProgress::default()
        }
    }

    fn request(course_id: &str, status: &str) -> CourseRequest {
        serde_json::from_value(json!({
            "id": "r1",
            "course_id": course_id,
            "status": status,
        }))
        .unwrap()
    }

    #[test]
    fn test_first_lesson_always_unlocked() {
        let course = course();
        let lessons = lessons(&course, &CourseProgress::default());
        assert!(lessons[0].unlocked);
        assert!(lessons.iter().skip(1).all(|l| !l.unlocked));
    }

    #[test]
    fn test_watching_unlocks_next() {
        let course = course();
        let first = course.videos[0].id.clone();
        let lessons = lessons(&course, &progress(&[(&first, true, true)]));
        assert!(lessons[0].watched);
        assert!(lessons[1].unlocked);
        assert!(!lessons[1].watched);
        if let Some(third) = lessons.get(2) {
            assert!(!third.unlocked);
        }
    }

    #[test]
    fn test_backend_unlock_respected() {
        let course = course();
        let second = course.videos[1].id.clone();
        let lessons = lessons(&course, &progress(&[(&second, false, true)]));
        assert!(lessons[1].unlocked);
    }

    #[test]
    fn test_course_status_precedence() {
        let enrolled: Vec<EnrolledCourse> = Vec::new();
        assert_eq!(course_status("ev", &enrolled, &[]), CourseStatus::Available);
        assert_eq!(
            course_status("ev", &enrolled, &[request("ev", "rejected"), request("ev", "pending")]),
            CourseStatus::Pending
        );
        assert_eq!(
            course_status("ev", &enrolled, &[request("ev", "pending"), request("ev", "approved")]),
            CourseStatus::Enrolled
        );
        assert_eq!(
            course_status("ev", &enrolled, &[request("adas", "approved")]),
            CourseStatus::Available
        );
        assert!(course_status("ev", &enrolled, &[request("ev", "rejected")]).can_request());
    }

    #[test]
    fn test_enrollment_grants_access() {
        let enrolled: Vec<EnrolledCourse> =
            serde_json::from_value(json!([{ "course_id": "ev" }])).unwrap();
        assert!(course_status("ev", &enrolled, &[]).has_access());
    }
}
