//! Blog route handlers.
//!
//! Posts live in the backend. The index pages through them with an offset;
//! "Load more" asks for the next page as an HTMX fragment.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use crate::api::{BLOG_PAGE_SIZE, BlogPage, BlogPost};
use crate::content::render_markdown;
use crate::error::AppError;
use crate::filters;
use crate::routes::PageContext;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BlogQuery {
    pub q: Option<String>,
    pub offset: u32,
}

impl BlogQuery {
    fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// A page of posts plus the link for the next page.
pub struct PostsPage {
    pub posts: Vec<BlogPost>,
    /// Query string for the next page, when there is one.
    pub next_query: Option<String>,
}

impl PostsPage {
    fn from_backend(page: &BlogPage, search: Option<&str>) -> Self {
        let limit = if page.pagination.limit == 0 {
            BLOG_PAGE_SIZE
        } else {
            page.pagination.limit
        };
        Self::new(
            page.data.clone(),
            page.pagination.has_more,
            page.pagination.offset + limit,
            search,
        )
    }

    fn new(posts: Vec<BlogPost>, has_more: bool, next_offset: u32, search: Option<&str>) -> Self {
        let next_query = has_more.then(|| match search {
            Some(q) => format!("offset={next_offset}&q={}", urlencoding::encode(q)),
            None => format!("offset={next_offset}"),
        });
        Self { posts, next_query }
    }
}

/// Blog index page template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/index.html")]
pub struct BlogIndexTemplate {
    pub ctx: PageContext,
    pub q: String,
    pub total: u64,
    pub page: PostsPage,
    /// Inline banner when the backend could not be reached.
    pub error: Option<String>,
}

/// Post cards and the next "load more" button (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "blog/_posts.html")]
pub struct BlogPostsFragment {
    pub page: PostsPage,
}

/// Blog post detail template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/show.html")]
pub struct BlogShowTemplate {
    pub ctx: PageContext,
    pub post: BlogPost,
    pub content_html: String,
    pub base_url: String,
}

/// Display the blog index, or the next page of cards for HTMX.
///
/// # Errors
///
/// Returns an error for HTMX requests the backend cannot answer.
#[instrument(skip(state, ctx, headers))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    headers: HeaderMap,
    Query(query): Query<BlogQuery>,
) -> Result<Response, AppError> {
    let search = query.search();
    let result = state.api().list_posts(query.offset, search).await;

    if headers.contains_key("HX-Request") {
        let page = result?;
        return Ok(BlogPostsFragment {
            page: PostsPage::from_backend(&page, search),
        }
        .into_response());
    }

    let (page, total, error) = match result {
        Ok(page) => (PostsPage::from_backend(&page, search), page.pagination.total, None),
        Err(e) => {
            tracing::warn!("Failed to fetch blog posts: {e}");
            (PostsPage::new(Vec::new(), false, 0, search), 0, Some(e.user_message()))
        }
    };

    Ok(BlogIndexTemplate {
        ctx,
        q: search.unwrap_or_default().to_string(),
        total,
        page,
        error,
    }
    .into_response())
}

/// Display a single blog post by slug.
///
/// # Errors
///
/// Returns 404 if the post doesn't exist.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post = state.api().post_by_slug(&slug).await?;
    let content_html = post
        .content
        .as_deref()
        .map(|content| render_markdown(content, false))
        .unwrap_or_default();

    Ok(BlogShowTemplate {
        ctx,
        post,
        content_html,
        base_url: state.config().base_url.clone(),
    })
}

/// Create the blog routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{slug}", get(show))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_query_keeps_search() {
        let page = PostsPage::new(Vec::new(), true, 20, Some("adas calibration"));
        assert_eq!(page.next_query.as_deref(), Some("offset=20&q=adas%20calibration"));
    }

    #[test]
    fn test_no_next_query_on_last_page() {
        let page = PostsPage::new(Vec::new(), false, 20, None);
        assert!(page.next_query.is_none());
    }
}
