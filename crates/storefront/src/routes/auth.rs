//! Authentication route handlers.
//!
//! Handles login, registration, logout and password reset against the
//! backend's email/password auth. The backend token is kept in the session
//! (see [`CurrentUser`]); the browser only ever holds the session cookie.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::validation::{FieldErrors, is_valid_email, validate_password_pair};

use crate::api::{ApiError, AuthSession, RegisterRequest};
use crate::error::{AppError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::auth::safe_next;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Flash};
use crate::routes::PageContext;
use crate::routes::context::set_flash;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub next: Option<String>,
}

impl RegisterForm {
    /// Per-field problems found before calling the backend.
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.require("first_name", "First name", &self.first_name);
        errors.require("last_name", "Last name", &self.last_name);
        if errors.require("email", "Email", &self.email) && !is_valid_email(&self.email) {
            errors.insert("email", "Invalid email address");
        }
        if let Err(password_errors) = validate_password_pair(&self.password, &self.confirm_password) {
            for (field, message) in password_errors.iter() {
                errors.insert(field, message);
            }
        }
        errors
    }
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the login page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginQuery {
    pub next: Option<String>,
    /// Set when the backend rejected the previous session's token.
    pub expired: Option<String>,
}

/// Query parameters for the reset page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetQuery {
    pub token: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
    pub expired: bool,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub form: RegisterForm,
    pub next: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub error: Option<String>,
    pub sent: bool,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub ctx: PageContext,
    pub token: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Put the authenticated user into the session and tag Sentry.
async fn sign_in(session: &Session, auth: AuthSession) -> Result<CurrentUser, AppError> {
    let user = CurrentUser::new(&auth.user, auth.token);
    set_current_user(session, &user).await?;
    set_sentry_user(&user.id, Some(&user.email));
    add_breadcrumb("auth", "Signed in", None);
    Ok(user)
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(ctx, current))]
pub async fn login_page(
    ctx: PageContext,
    OptionalAuth(current): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref()).to_string();
    if current.is_some() {
        return Redirect::to(&next).into_response();
    }
    LoginTemplate {
        ctx,
        email: String::new(),
        next,
        error: None,
        expired: query.expired.is_some(),
    }
    .into_response()
}

/// Handle login form submission.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let next = safe_next(form.next.as_deref()).to_string();
    let email = form.email.trim().to_string();
    let retry = |ctx, email, next, error: &str| LoginTemplate {
        ctx,
        email,
        next,
        error: Some(error.to_string()),
        expired: false,
    };

    if email.is_empty() || form.password.is_empty() {
        return Ok(retry(ctx, email, next, "Email and password are required").into_response());
    }

    let password = SecretString::from(form.password);
    match state.api().login(&email, &password).await {
        Ok(auth) => {
            let user = sign_in(&session, auth).await?;
            tracing::info!(user_id = %user.id, "User logged in");
            Ok(Redirect::to(&next).into_response())
        }
        Err(e) => {
            tracing::warn!("Login failed: {e}");
            Ok(retry(ctx, email, next, &e.user_message()).into_response())
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(ctx, current))]
pub async fn register_page(
    ctx: PageContext,
    OptionalAuth(current): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref()).to_string();
    if current.is_some() {
        return Redirect::to(&next).into_response();
    }
    RegisterTemplate {
        ctx,
        form: RegisterForm::default(),
        next,
        errors: FieldErrors::new(),
        error: None,
    }
    .into_response()
}

/// Handle registration form submission. A new account is signed in
/// straight away.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let next = safe_next(form.next.as_deref()).to_string();

    let errors = form.validate();
    if !errors.is_empty() {
        return Ok(RegisterTemplate {
            ctx,
            form,
            next,
            errors,
            error: None,
        }
        .into_response());
    }

    let request = RegisterRequest {
        email: form.email.trim(),
        password: &form.password,
        first_name: form.first_name.trim(),
        last_name: form.last_name.trim(),
    };
    match state.api().register(&request).await {
        Ok(auth) => {
            let user = sign_in(&session, auth).await?;
            tracing::info!(user_id = %user.id, "User registered");
            set_flash(&session, Flash::success("Welcome to Diag Wheels! Your account is ready.")).await;
            Ok(Redirect::to(&next).into_response())
        }
        Err(e) => {
            tracing::warn!("Registration failed: {e}");
            let error = Some(e.user_message());
            Ok(RegisterTemplate {
                ctx,
                form,
                next,
                errors: FieldErrors::new(),
                error,
            }
            .into_response())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout. The local session is cleared even if the backend call
/// fails.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(current): OptionalAuth,
) -> Result<Response, AppError> {
    if let Some(user) = current {
        if let Err(e) = state.api().logout(&user.token()).await {
            tracing::warn!(user_id = %user.id, "Backend logout failed: {e}");
        }
        tracing::info!(user_id = %user.id, "User logged out");
    }
    clear_current_user(&session).await?;
    clear_sentry_user();
    set_flash(&session, Flash::info("You have been signed out.")).await;
    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(ctx: PageContext) -> impl IntoResponse {
    ForgotPasswordTemplate {
        ctx,
        email: String::new(),
        error: None,
        sent: false,
    }
}

/// Ask the backend to email a reset link.
///
/// The confirmation is shown whether or not the email has an account.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ctx: PageContext,
    Form(form): Form<ForgotPasswordForm>,
) -> impl IntoResponse {
    let email = form.email.trim().to_string();
    if !is_valid_email(&email) {
        return ForgotPasswordTemplate {
            ctx,
            email,
            error: Some("Please enter a valid email address".to_string()),
            sent: false,
        };
    }

    match state.api().forgot_password(&email).await {
        Ok(_) | Err(ApiError::NotFound(_)) => ForgotPasswordTemplate {
            ctx,
            email,
            error: None,
            sent: true,
        },
        Err(e) => {
            tracing::warn!("Forgot password request failed: {e}");
            ForgotPasswordTemplate {
                ctx,
                email,
                error: Some(e.user_message()),
                sent: false,
            }
        }
    }
}

/// Display the reset password form.
///
/// # Errors
///
/// Returns 404 when the link has no token.
pub async fn reset_password_page(
    ctx: PageContext,
    Query(query): Query<ResetQuery>,
) -> Result<impl IntoResponse, AppError> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::NotFound("reset token".to_string()))?;
    Ok(ResetPasswordTemplate {
        ctx,
        token,
        errors: FieldErrors::new(),
        error: None,
    })
}

/// Set a new password with the emailed token.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    if let Err(errors) = validate_password_pair(&form.password, &form.confirm_password) {
        return ResetPasswordTemplate {
            ctx,
            token: form.token,
            errors,
            error: None,
        }
        .into_response();
    }

    let password = SecretString::from(form.password);
    match state.api().reset_password(&form.token, &password).await {
        Ok(message) => {
            let message = message.unwrap_or_else(|| {
                "Your password has been reset. Please sign in with your new password.".to_string()
            });
            set_flash(&session, Flash::success(message)).await;
            Redirect::to("/auth/login").into_response()
        }
        Err(e) => {
            tracing::warn!("Password reset failed: {e}");
            ResetPasswordTemplate {
                ctx,
                token: form.token,
                errors: FieldErrors::new(),
                error: Some(e.user_message()),
            }
            .into_response()
        }
    }
}

/// Create the auth routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
        .route("/logout", post(logout))
        .route(
            "/forgot-password",
            get(forgot_password_page).post(forgot_password),
        )
        .route("/reset-password", get(reset_password_page).post(reset_password))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegisterForm {
        RegisterForm {
            first_name: "Ravi".to_string(),
            last_name: "Kumar".to_string(),
            email: "ravi@example.in".to_string(),
            password: "Workshop2024".to_string(),
            confirm_password: "Workshop2024".to_string(),
            next: None,
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(form().validate().is_empty());
    }

    #[test]
    fn test_registration_field_errors() {
        let mut bad = form();
        bad.first_name = " ".to_string();
        bad.email = "ravi@".to_string();
        bad.confirm_password = "different".to_string();
        let errors = bad.validate();
        assert!(errors.has("first_name"));
        assert!(errors.has("email"));
        assert!(errors.has("confirm_password"));
        assert!(!errors.has("last_name"));
    }
}
