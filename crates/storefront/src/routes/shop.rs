//! Shop route handlers: product grid with search and the cascading category
//! filter, and the product detail page.

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

use diag_wheels_core::ProductType;
use diag_wheels_core::category::{CascadingFilter, CategoryTree, FilterLevel, matches_search};
use diag_wheels_core::pricing::PriceTier;

use crate::api::{Product, ProductQuery};
use crate::error::AppError;
use crate::filters;
use crate::routes::PageContext;
use crate::state::AppState;

/// Related products shown under a product.
const RELATED_PRODUCTS: usize = 4;

/// Shop query string: search, one parameter per category level, type.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShopQuery {
    pub q: String,
    pub c0: String,
    pub c1: String,
    pub c2: String,
    pub c3: String,
    #[serde(rename = "type")]
    pub product_type: String,
}

impl ShopQuery {
    fn product_type(&self) -> Option<ProductType> {
        match self.product_type.as_str() {
            "physical" => Some(ProductType::Physical),
            "digital" => Some(ProductType::Digital),
            _ => None,
        }
    }

    fn filter(&self, tree: &CategoryTree) -> CascadingFilter {
        valid_selection(
            &CascadingFilter::from_path([&self.c0, &self.c1, &self.c2, &self.c3]),
            tree,
        )
    }
}

/// Drop the first selected level that is not an option under its parent,
/// and everything after it. A parent change leaves stale child values in
/// the submitted form.
#[must_use]
pub fn valid_selection(filter: &CascadingFilter, tree: &CategoryTree) -> CascadingFilter {
    let mut valid = CascadingFilter::new();
    for (level, value) in filter.selected().iter().enumerate() {
        if !tree.options(level, valid.selected()).contains(value) {
            break;
        }
        valid.select(level, value.clone());
    }
    valid
}

/// Filter panel and product grid, swapped as one by HTMX.
pub struct ShopResults {
    pub q: String,
    pub product_type: String,
    pub levels: Vec<FilterLevel>,
    /// Selected category path, root first.
    pub path: Vec<String>,
    pub products: Vec<Product>,
    pub total: usize,
    pub filtered: bool,
    /// Inline banner when the backend could not be reached.
    pub error: Option<String>,
}

/// Shop page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/index.html")]
pub struct ShopIndexTemplate {
    pub ctx: PageContext,
    pub results: ShopResults,
}

/// Filter panel and grid (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "shop/_results.html")]
pub struct ShopResultsFragment {
    pub results: ShopResults,
}

/// Display the product grid.
///
/// HTMX requests get only the filter panel and grid back.
#[instrument(skip(state, ctx, headers))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    headers: HeaderMap,
    Query(query): Query<ShopQuery>,
) -> Response {
    let backend_query = ProductQuery {
        product_type: query.product_type(),
        ..ProductQuery::default()
    };

    let (listed, error) = match state.api().list_products(&backend_query).await {
        Ok(products) => (
            products.iter().filter(|p| p.is_listed()).cloned().collect::<Vec<_>>(),
            None,
        ),
        Err(e) => {
            tracing::warn!("Failed to fetch products: {e}");
            (Vec::new(), Some(e.user_message()))
        }
    };

    let tree = CategoryTree::build(listed.iter().map(Product::category_path));
    let filter = query.filter(&tree);
    let total = listed.len();
    let products: Vec<Product> = listed
        .into_iter()
        .filter(|p| {
            let path = p.category_path();
            filter.matches(&path) && matches_search(&query.q, &p.name, &path)
        })
        .collect();

    let results = ShopResults {
        q: query.q.trim().to_string(),
        filtered: filter.is_active() || !query.q.trim().is_empty() || query.product_type().is_some(),
        product_type: query.product_type().map(|t| t.as_str().to_string()).unwrap_or_default(),
        levels: filter.levels(&tree),
        path: filter.selected().to_vec(),
        products,
        total,
        error,
    };

    if headers.contains_key("HX-Request") {
        ShopResultsFragment { results }.into_response()
    } else {
        ShopIndexTemplate { ctx, results }.into_response()
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/show.html")]
pub struct ShopShowTemplate {
    pub ctx: PageContext,
    pub product: Product,
    pub tiers: Vec<PriceTier>,
    pub related: Vec<Product>,
}

/// Display a product by slug.
///
/// # Errors
///
/// Returns 404 for unknown or unlisted products.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.api().product_by_slug(&slug).await?;
    if !product.is_listed() {
        return Err(AppError::NotFound(format!("product {slug}")));
    }

    let related = match state.api().list_products(&ProductQuery::default()).await {
        Ok(products) => {
            let category = product.category_label();
            products
                .iter()
                .filter(|p| p.id != product.id && p.is_listed() && p.category_label() == category)
                .take(RELATED_PRODUCTS)
                .cloned()
                .collect()
        }
        Err(e) => {
            tracing::warn!("Failed to fetch related products: {e}");
            Vec::new()
        }
    };

    let tiers = match product.product_type {
        ProductType::Physical => product.quantity_pricing.clone(),
        ProductType::Digital => Vec::new(),
    };

    Ok(ShopShowTemplate {
        ctx,
        product,
        tiers,
        related,
    })
}

/// Create the shop routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{slug}", get(show))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> CategoryTree {
        CategoryTree::build([
            vec!["Tools", "OBD", "Bluetooth"],
            vec!["Tools", "OBD", "Wired"],
            vec!["Tools", "Multimeters"],
            vec!["Software", "Tuning"],
        ])
    }

    #[test]
    fn test_stale_child_dropped_after_parent_change() {
        let submitted = CascadingFilter::from_path(["Software", "OBD", "Wired"]);
        let valid = valid_selection(&submitted, &tree());
        assert_eq!(valid.selected(), ["Software".to_string()]);
    }

    #[test]
    fn test_valid_path_kept() {
        let submitted = CascadingFilter::from_path(["Tools", "OBD", "Wired"]);
        let valid = valid_selection(&submitted, &tree());
        assert_eq!(valid.selected().len(), 3);
    }

    #[test]
    fn test_unknown_root_clears_selection() {
        let submitted = CascadingFilter::from_path(["Toys"]);
        assert!(!valid_selection(&submitted, &tree()).is_active());
    }

    #[test]
    fn test_type_parameter() {
        let query = ShopQuery {
            product_type: "digital".to_string(),
            ..ShopQuery::default()
        };
        assert_eq!(query.product_type(), Some(ProductType::Digital));
        assert_eq!(ShopQuery::default().product_type(), None);
    }
}
