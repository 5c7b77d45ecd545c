//! Static content page route handlers.
//!
//! Serves the markdown pages in `content/pages`: about and the two sets of
//! terms shown before a course or product purchase.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Router, extract::State, response::IntoResponse, routing::get};
use chrono::NaiveDate;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::routes::PageContext;
use crate::state::AppState;

/// Content page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/content.html")]
pub struct ContentPageTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub description: String,
    pub updated_at: Option<NaiveDate>,
    pub content_html: String,
}

/// Serve a content page by slug.
fn serve_content_page(
    state: &AppState,
    ctx: PageContext,
    slug: &str,
) -> Result<ContentPageTemplate, AppError> {
    let page = state
        .content()
        .get_page(slug)
        .ok_or_else(|| AppError::NotFound(format!("page {slug}")))?;

    Ok(ContentPageTemplate {
        ctx,
        title: page.meta.title.clone(),
        description: page.meta.description.clone().unwrap_or_default(),
        updated_at: page.meta.updated_at,
        content_html: page.content_html.clone(),
    })
}

/// Display the About page.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state, ctx))]
pub async fn about(State(state): State<AppState>, ctx: PageContext) -> Result<impl IntoResponse, AppError> {
    serve_content_page(&state, ctx, "about")
}

/// Display the course terms and conditions.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state, ctx))]
pub async fn course_terms(State(state): State<AppState>, ctx: PageContext) -> Result<impl IntoResponse, AppError> {
    serve_content_page(&state, ctx, "terms-courses")
}

/// Display the product terms and conditions.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state, ctx))]
pub async fn product_terms(State(state): State<AppState>, ctx: PageContext) -> Result<impl IntoResponse, AppError> {
    serve_content_page(&state, ctx, "terms-products")
}

/// Create the pages routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/about", get(about))
        .route("/terms/courses", get(course_terms))
        .route("/terms/products", get(product_terms))
}
