//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::validation::FieldErrors;

use crate::api::{ApiError, CourseRequest, EnrolledCourse, Order, ProductEntitlement, ProfileUpdate, User};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::Flash;
use crate::routes::context::set_flash;
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub ctx: PageContext,
    pub profile: Option<User>,
    pub form: ProfileUpdate,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<Order>,
}

/// A purchased or granted digital product, with an absolute download link.
pub struct DownloadView {
    pub name: String,
    pub slug: Option<String>,
    pub file_name: Option<String>,
    pub format: Option<&'static str>,
    pub download_url: Option<String>,
    pub granted_at: Option<String>,
    pub note: Option<String>,
}

impl DownloadView {
    fn new(entitlement: ProductEntitlement, state: &AppState) -> Self {
        Self {
            name: entitlement
                .product_name
                .unwrap_or_else(|| "Digital product".to_string()),
            slug: entitlement.product_slug,
            file_name: entitlement.digital_file_name,
            format: entitlement.digital_file_format.map(|f| f.label()),
            download_url: entitlement
                .download_url
                .filter(|url| !url.trim().is_empty())
                .map(|url| state.api().asset_url(&url)),
            granted_at: entitlement.granted_at,
            note: entitlement.note,
        }
    }
}

/// Downloads page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/downloads.html")]
pub struct DownloadsTemplate {
    pub ctx: PageContext,
    pub downloads: Vec<DownloadView>,
}

/// My courses template.
#[derive(Template, WebTemplate)]
#[template(path = "account/courses.html")]
pub struct MyCoursesTemplate {
    pub ctx: PageContext,
    pub courses: Vec<EnrolledCourse>,
    pub requests: Vec<CourseRequest>,
}

// =============================================================================
// Profile
// =============================================================================

fn profile_form(user: &User) -> ProfileUpdate {
    ProfileUpdate {
        first_name: user.first_name.clone().unwrap_or_default(),
        last_name: user.last_name.clone().unwrap_or_default(),
        phone: user.phone.clone().unwrap_or_default(),
    }
}

fn validate_profile(form: &ProfileUpdate) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.require("first_name", "First name", &form.first_name);
    errors.require("last_name", "Last name", &form.last_name);
    errors
}

/// Display the profile page.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    let (profile, error) = match state.api().profile(&user.token()).await {
        Ok(profile) => (Some(profile), None),
        Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
        Err(e) => {
            tracing::warn!("Failed to load profile: {e}");
            (None, Some(e.user_message()))
        }
    };

    let form = profile.as_ref().map(profile_form).unwrap_or_else(|| ProfileUpdate {
        first_name: user.first_name.clone().unwrap_or_default(),
        last_name: user.last_name.clone().unwrap_or_default(),
        phone: String::new(),
    });

    Ok(ProfileTemplate {
        ctx,
        profile,
        form,
        errors: FieldErrors::new(),
        error,
    }
    .into_response())
}

/// Save name and phone.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileUpdate>,
) -> Result<Response, AppError> {
    let errors = validate_profile(&form);
    if !errors.is_empty() {
        return Ok(ProfileTemplate {
            ctx,
            profile: None,
            form,
            errors,
            error: None,
        }
        .into_response());
    }

    let update = ProfileUpdate {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        phone: form.phone.trim().to_string(),
    };
    match state.api().update_profile(&user.token(), &update).await {
        Ok(updated) => {
            let mut current = user;
            current.refresh(&updated);
            set_current_user(&session, &current).await?;
            set_flash(&session, Flash::success("Profile updated.")).await;
            Ok(Redirect::to("/account").into_response())
        }
        Err(ApiError::SessionExpired) => Err(ApiError::SessionExpired.into()),
        Err(e) => {
            tracing::warn!("Profile update failed: {e}");
            Ok(ProfileTemplate {
                ctx,
                profile: None,
                form,
                errors: FieldErrors::new(),
                error: Some(e.user_message()),
            }
            .into_response())
        }
    }
}

// =============================================================================
// Orders, Downloads, Courses
// =============================================================================

/// Display the order history, newest first.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let mut orders = or_default(state.api().my_orders(&user.token()).await, "orders")?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(OrdersTemplate { ctx, orders })
}

/// Display purchased and granted digital products.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn downloads(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let entitlements = or_default(state.api().my_entitlements(&user.token()).await, "entitlements")?;
    let downloads = entitlements
        .into_iter()
        .map(|e| DownloadView::new(e, &state))
        .collect();
    Ok(DownloadsTemplate { ctx, downloads })
}

/// Display enrolled courses and access requests.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn courses(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let token = user.token();
    let (courses, requests) = tokio::join!(
        state.api().my_courses(&token),
        state.api().my_course_requests(&token)
    );
    Ok(MyCoursesTemplate {
        ctx,
        courses: or_default(courses, "enrolled courses")?,
        requests: or_default(requests, "course requests")?,
    })
}

/// Create the account routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(profile).post(update_profile))
        .route("/orders", get(orders))
        .route("/downloads", get(downloads))
        .route("/courses", get(courses))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_requires_names() {
        let errors = validate_profile(&ProfileUpdate {
            first_name: String::new(),
            last_name: "Nair".to_string(),
            phone: String::new(),
        });
        assert!(errors.has("first_name"));
        assert!(!errors.has("last_name"));
        assert!(!errors.has("phone"));
    }
}
