//! Admin user management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::validation::{FieldErrors, is_valid_email, validate_password};
use diag_wheels_core::{UserId, UserRole};

use crate::api::{ApiError, LoginDetails, NewUser, UserPage, UserQuery, UserUpdate};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::routes::context::set_flash;
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

use super::finish;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserListQuery {
    pub q: String,
    pub role: String,
    pub page: u32,
}

impl UserListQuery {
    fn role(&self) -> Option<UserRole> {
        match self.role.as_str() {
            "admin" => Some(UserRole::Admin),
            "user" => Some(UserRole::User),
            _ => None,
        }
    }

    /// Query string for another page with the same filters.
    fn page_query(&self, page: u64) -> String {
        let mut query = format!("page={page}");
        if !self.q.trim().is_empty() {
            query.push_str("&q=");
            query.push_str(&urlencoding::encode(self.q.trim()));
        }
        if let Some(role) = self.role() {
            query.push_str("&role=");
            query.push_str(role.as_str());
        }
        query
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/users/index.html")]
pub struct UsersTemplate {
    pub ctx: PageContext,
    pub users: UserPage,
    pub q: String,
    pub role: String,
    pub prev_query: Option<String>,
    pub next_query: Option<String>,
}

/// List users with search, role filter and paging.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, ctx, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let backend_query = UserQuery {
        page: query.page.max(1),
        limit: 50,
        role: query.role(),
        search: Some(query.q.clone()),
    };
    let users = or_default(state.api().admin_users(&admin.token(), &backend_query).await, "users")?;

    let page = users.pagination.page.max(1);
    let prev_query = (page > 1).then(|| query.page_query(page - 1));
    let next_query = (page < users.pagination.pages).then(|| query.page_query(page + 1));

    Ok(UsersTemplate {
        ctx,
        users,
        q: query.q.trim().to_string(),
        role: query.role().map(|r| r.as_str().to_string()).unwrap_or_default(),
        prev_query,
        next_query,
    })
}

// =============================================================================
// Create
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct NewUserForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: UserRole,
}

impl Default for NewUserForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role: UserRole::User,
        }
    }
}

impl NewUserForm {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if errors.require("email", "Email", &self.email) && !is_valid_email(&self.email) {
            errors.insert("email", "Invalid email address");
        }
        if let Err(e) = validate_password(&self.password) {
            errors.insert("password", e.to_string());
        }
        errors.require("first_name", "First name", &self.first_name);
        errors.require("last_name", "Last name", &self.last_name);
        errors
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/users/new.html")]
pub struct NewUserTemplate {
    pub ctx: PageContext,
    pub form: NewUserForm,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Display the create user form.
pub async fn new(ctx: PageContext, RequireAdmin(_admin): RequireAdmin) -> impl IntoResponse {
    NewUserTemplate {
        ctx,
        form: NewUserForm::default(),
        errors: FieldErrors::new(),
        error: None,
    }
}

/// Create a user.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(admin_id = %admin.id, email = %form.email))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<NewUserForm>,
) -> Result<Response, AppError> {
    let errors = form.validate();
    if !errors.is_empty() {
        return Ok(NewUserTemplate {
            ctx,
            form,
            errors,
            error: None,
        }
        .into_response());
    }

    let new_user = NewUser {
        email: form.email.trim(),
        password: &form.password,
        first_name: form.first_name.trim(),
        last_name: form.last_name.trim(),
        role: form.role,
    };
    match state.api().admin_create_user(&admin.token(), &new_user).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Admin created user");
            set_flash(&session, Flash::success(format!("Created {}", user.email))).await;
            Ok(Redirect::to("/admin/users").into_response())
        }
        Err(ApiError::SessionExpired) => Err(ApiError::SessionExpired.into()),
        Err(e) => {
            tracing::warn!("Create user failed: {e}");
            let error = Some(e.user_message());
            Ok(NewUserTemplate {
                ctx,
                form,
                errors: FieldErrors::new(),
                error,
            }
            .into_response())
        }
    }
}

// =============================================================================
// Show / Update / Delete
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "admin/users/show.html")]
pub struct UserShowTemplate {
    pub ctx: PageContext,
    pub details: LoginDetails,
    /// The admin viewing the page; they cannot delete themselves.
    pub is_self: bool,
}

/// Display login details and the edit form.
///
/// # Errors
///
/// Returns 404 for unknown users.
#[instrument(skip(state, ctx, admin), fields(admin_id = %admin.id))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, AppError> {
    let details = state.api().admin_login_details(&admin.token(), &id).await?;
    Ok(UserShowTemplate {
        ctx,
        is_self: details.user.id == admin.id,
        details,
    })
}

#[derive(Debug, Deserialize)]
pub struct UserEditForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: UserRole,
    /// Checkbox; absent when unticked.
    #[serde(default)]
    pub is_active: Option<String>,
    /// Blank keeps the current password.
    #[serde(default)]
    pub password: String,
}

/// Update a user.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Form(form): Form<UserEditForm>,
) -> Result<Response, AppError> {
    let back = format!("/admin/users/{id}");
    let password = Some(form.password.as_str()).filter(|p| !p.is_empty());
    if let Some(Err(e)) = password.map(validate_password) {
        set_flash(&session, Flash::error(e.to_string())).await;
        return Ok(Redirect::to(&back).into_response());
    }

    let update = UserUpdate {
        first_name: form.first_name.trim(),
        last_name: form.last_name.trim(),
        role: form.role,
        is_active: form.is_active.is_some(),
        password,
    };
    let result = state
        .api()
        .admin_update_user(&admin.token(), &id, &update)
        .await
        .map(|_| ());
    finish(&session, result, "User updated.", &back).await
}

/// Delete a user.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Response, AppError> {
    if id == admin.id {
        set_flash(&session, Flash::error("You cannot delete your own account.")).await;
        return Ok(Redirect::to(&format!("/admin/users/{id}")).into_response());
    }
    let result = state.api().admin_delete_user(&admin.token(), &id).await;
    finish(&session, result, "User deleted.", "/admin/users").await
}
