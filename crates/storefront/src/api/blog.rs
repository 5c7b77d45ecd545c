//! Blog endpoints.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::cache::CacheValue;
use super::types::{BlogPage, BlogPost};
use super::{ApiClient, ApiError};

/// Posts per page / "load more" batch.
pub const BLOG_PAGE_SIZE: u32 = 10;

impl ApiClient {
    /// A page of published posts. Cached for 5 minutes per page and search.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn list_posts(
        &self,
        offset: u32,
        search: Option<&str>,
    ) -> Result<Arc<BlogPage>, ApiError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let cache_key = format!("blog:{offset}:{}", search.unwrap_or_default());
        if let Some(CacheValue::BlogPage(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for blog page");
            return Ok(page);
        }

        let mut params = vec![
            ("limit", BLOG_PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(search) = search {
            params.push(("search", search.to_string()));
        }

        let page: BlogPage = self.get("blogs", &params, None).await?;
        let page = Arc::new(page);
        self.inner
            .cache
            .insert(cache_key, CacheValue::BlogPage(Arc::clone(&page)))
            .await;
        Ok(page)
    }

    /// A post by slug. Cached for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown slugs.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn post_by_slug(&self, slug: &str) -> Result<BlogPost, ApiError> {
        let cache_key = format!("post:{slug}");
        if let Some(CacheValue::BlogPost(post)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for blog post");
            return Ok(*post);
        }

        let path = format!("blogs/{}", urlencoding::encode(slug));
        let post: BlogPost = self.get(&path, &[], None).await?;
        self.inner
            .cache
            .insert(cache_key, CacheValue::BlogPost(Box::new(post.clone())))
            .await;
        Ok(post)
    }
}
