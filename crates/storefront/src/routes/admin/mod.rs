//! Admin console.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin), so
//! anonymous visitors are sent to the login page and signed-in non-admins
//! get a 403. All data comes from the backend's admin endpoints with the
//! admin's own token.
//!
//! # Route Structure
//!
//! ```text
//! GET  /admin                              Dashboard
//! GET  /admin/users                        User list (search, role, page)
//! GET  /admin/users/new, POST /admin/users Create user
//! GET  /admin/users/{id}                   Login details + edit form
//! POST /admin/users/{id}                   Update user
//! POST /admin/users/{id}/delete            Delete user
//! GET  /admin/requests                     Course requests (status, page)
//! POST /admin/requests/{id}/approve|reject
//! GET  /admin/products                     Product list
//! GET  /admin/products/new, POST /admin/products
//! GET  /admin/products/{id}, POST /admin/products/{id}
//! POST /admin/products/{id}/delete
//! POST /admin/products/{id}/grant          Grant a digital product
//! GET  /admin/orders                       Orders (status filter)
//! POST /admin/orders/{id}/mark-paid
//! GET  /admin/kyc                          KYC submissions (status filter)
//! GET  /admin/kyc/{id}                     Submission detail
//! POST /admin/kyc/{id}/verify|reject
//! GET  /admin/announcements, POST /admin/announcements
//! ```

mod announcements;
mod dashboard;
mod kyc;
mod orders;
mod products;
mod requests;
mod users;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::api::ApiError;
use crate::error::AppError;
use crate::models::Flash;
use crate::routes::context::set_flash;
use crate::routes::uploads::body_limit;
use crate::state::AppState;

/// Flash the outcome of an admin action and go back to `to`.
///
/// Session expiry still signs the admin out; every other backend failure
/// becomes an error flash.
async fn finish(
    session: &Session,
    result: Result<(), ApiError>,
    success: &str,
    to: &str,
) -> Result<Response, AppError> {
    match result {
        Ok(()) => set_flash(session, Flash::success(success)).await,
        Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
        Err(e) => {
            tracing::warn!("Admin action failed: {e}");
            set_flash(session, Flash::error(e.user_message())).await;
        }
    }
    Ok(Redirect::to(to).into_response())
}

/// Create the admin routes router.
pub fn router() -> Router<AppState> {
    let products = Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/new", get(products::new))
        .route("/{id}", get(products::edit).post(products::update))
        .route("/{id}/delete", post(products::delete))
        .route("/{id}/grant", post(products::grant))
        .layer(body_limit());

    Router::new()
        .route("/", get(dashboard::index))
        .route("/users", get(users::index).post(users::create))
        .route("/users/new", get(users::new))
        .route("/users/{id}", get(users::show).post(users::update))
        .route("/users/{id}/delete", post(users::delete))
        .route("/requests", get(requests::index))
        .route("/requests/{id}/approve", post(requests::approve))
        .route("/requests/{id}/reject", post(requests::reject))
        .nest("/products", products)
        .route("/orders", get(orders::index))
        .route("/orders/{id}/mark-paid", post(orders::mark_paid))
        .route("/kyc", get(kyc::index))
        .route("/kyc/{id}", get(kyc::show))
        .route("/kyc/{id}/verify", post(kyc::verify))
        .route("/kyc/{id}/reject", post(kyc::reject))
        .route(
            "/announcements",
            get(announcements::index).post(announcements::create),
        )
}
