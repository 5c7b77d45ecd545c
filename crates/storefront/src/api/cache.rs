//! Cache types for anonymous catalog reads.

use std::sync::Arc;

use super::types::{BlogPage, BlogPost, Product};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
    BlogPage(Arc<BlogPage>),
    BlogPost(Box<BlogPost>),
}
