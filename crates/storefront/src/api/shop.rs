//! Products, orders, payments and download entitlements.

use std::sync::Arc;

use reqwest::Method;
use reqwest::multipart::Form;
use secrecy::SecretString;
use tracing::{debug, instrument};

use diag_wheels_core::ProductType;
use diag_wheels_core::validation::ProductForm;

use super::cache::CacheValue;
use super::types::{
    AdminOrderSummary, CreateOrderRequest, GrantEntitlementRequest, MarkPaidRequest, Order,
    Product, ProductEntitlement, RazorpayOrder, RazorpayVerifyRequest,
};
use super::{ApiClient, ApiError, Body, Upload};
use diag_wheels_core::{OrderId, ProductId};

/// Filters for the public product list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub product_type: Option<ProductType>,
}

impl ProductQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            params.push(("q", q.to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            params.push(("category", category.to_string()));
        }
        if let Some(product_type) = self.product_type {
            params.push(("type", product_type.as_str().to_string()));
        }
        params
    }

    fn cache_key(&self) -> String {
        let params = self.params();
        let parts: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("products:{}", parts.join("&"))
    }
}

impl ApiClient {
    // =========================================================================
    // Catalog
    // =========================================================================

    /// Active products matching `query`. Cached for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Arc<Vec<Product>>, ApiError> {
        let cache_key = query.cache_key();
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let products: Vec<Product> = self.get("products", &query.params(), None).await?;
        let products = Arc::new(products);
        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// A product by slug. Cached for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown slugs.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn product_by_slug(&self, slug: &str) -> Result<Product, ApiError> {
        let cache_key = format!("product:{slug}");
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("products/{}", urlencoding::encode(slug));
        let product: Product = self.get(&path, &[], None).await?;
        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Every product including inactive ones. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn admin_list_products(&self, token: &SecretString) -> Result<Vec<Product>, ApiError> {
        self.get("products/admin/all", &[], Some(token)).await
    }

    /// Create a product from the admin editor.
    ///
    /// # Errors
    ///
    /// Returns an error if an upload is malformed or the backend rejects
    /// the product.
    #[instrument(skip_all, fields(name = %form.name))]
    pub async fn admin_create_product(
        &self,
        token: &SecretString,
        form: &ProductForm,
        cover_image: Option<Upload>,
        digital_file: Option<Upload>,
    ) -> Result<Product, ApiError> {
        let multipart = product_multipart(form, false, cover_image, digital_file)?;
        let product = self
            .post_multipart(Method::POST, "products/admin", multipart, token)
            .await?;
        self.invalidate_cache();
        Ok(product)
    }

    /// Update a product from the admin editor.
    ///
    /// # Errors
    ///
    /// Returns an error if an upload is malformed or the backend rejects
    /// the update.
    #[instrument(skip(self, token, form, cover_image, digital_file))]
    pub async fn admin_update_product(
        &self,
        token: &SecretString,
        id: &ProductId,
        form: &ProductForm,
        cover_image: Option<Upload>,
        digital_file: Option<Upload>,
    ) -> Result<Product, ApiError> {
        let multipart = product_multipart(form, true, cover_image, digital_file)?;
        let path = format!("products/admin/{id}");
        let product = self
            .post_multipart(Method::PUT, &path, multipart, token)
            .await?;
        self.invalidate_cache();
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip(self, token))]
    pub async fn admin_delete_product(&self, token: &SecretString, id: &ProductId) -> Result<(), ApiError> {
        let path = format!("products/admin/{id}");
        self.acknowledge(Method::DELETE, &path, Body::Empty, Some(token))
            .await?;
        self.invalidate_cache();
        Ok(())
    }

    // =========================================================================
    // Orders & payments
    // =========================================================================

    /// Place an order for the cart contents.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] if the backend refuses the order
    /// (stock, KYC, terms).
    #[instrument(skip_all, fields(lines = request.items.len()))]
    pub async fn create_order(
        &self,
        token: &SecretString,
        request: &CreateOrderRequest,
    ) -> Result<Order, ApiError> {
        self.post_json("orders", request, Some(token)).await
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn my_orders(&self, token: &SecretString) -> Result<Vec<Order>, ApiError> {
        self.get("orders", &[], Some(token)).await
    }

    /// All orders for the admin console.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn admin_orders(&self, token: &SecretString) -> Result<Vec<AdminOrderSummary>, ApiError> {
        self.get("orders/admin/all", &[], Some(token)).await
    }

    /// Record a manual payment for an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip(self, token, request))]
    pub async fn admin_mark_order_paid(
        &self,
        token: &SecretString,
        id: &OrderId,
        request: &MarkPaidRequest,
    ) -> Result<(), ApiError> {
        let path = format!("orders/admin/{id}/mark-paid");
        self.acknowledge(Method::POST, &path, Body::json(request)?, Some(token))
            .await
            .map(|_| ())
    }

    /// Create the gateway order that the Razorpay widget pays.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the gateway order.
    #[instrument(skip(self, token))]
    pub async fn create_razorpay_order(
        &self,
        token: &SecretString,
        order_id: &OrderId,
    ) -> Result<RazorpayOrder, ApiError> {
        self.post_json(
            "payments/razorpay/order",
            &serde_json::json!({ "order_id": order_id }),
            Some(token),
        )
        .await
    }

    /// Verify the widget's payment signature.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] if the signature does not verify.
    #[instrument(skip_all, fields(order = %request.internal_order_id))]
    pub async fn verify_razorpay_payment(
        &self,
        token: &SecretString,
        request: &RazorpayVerifyRequest,
    ) -> Result<Option<String>, ApiError> {
        self.acknowledge(
            Method::POST,
            "payments/razorpay/verify",
            Body::json(request)?,
            Some(token),
        )
        .await
    }

    // =========================================================================
    // Entitlements
    // =========================================================================

    /// Digital products the user may download.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn my_entitlements(&self, token: &SecretString) -> Result<Vec<ProductEntitlement>, ApiError> {
        self.get("users/product-entitlements", &[], Some(token)).await
    }

    /// Give a user free access to a digital product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip_all, fields(user = %request.user_id, product = %request.product_id))]
    pub async fn admin_grant_entitlement(
        &self,
        token: &SecretString,
        request: &GrantEntitlementRequest,
    ) -> Result<(), ApiError> {
        self.acknowledge(
            Method::POST,
            "admin/product-entitlements",
            Body::json(request)?,
            Some(token),
        )
        .await
        .map(|_| ())
    }
}

/// Build the multipart body for the product editor.
fn product_multipart(
    form: &ProductForm,
    updating: bool,
    cover_image: Option<Upload>,
    digital_file: Option<Upload>,
) -> Result<Form, ApiError> {
    let mut multipart = Form::new()
        .text("name", form.name.trim().to_string())
        .text("slug", form.resolved_slug())
        .text("product_type", form.product_type.as_str())
        .text("price", form.price.to_string());

    let description = form.description.trim();
    if updating || !description.is_empty() {
        multipart = multipart.text("description", description.to_string());
    }

    let categories = form.categories();
    if let Some(leaf) = categories.last() {
        multipart = multipart.text("category", leaf.clone());
        multipart = multipart.text("categories", serde_json::to_string(&categories)?);
    } else if updating {
        multipart = multipart.text("category", String::new());
    }

    if form.product_type == ProductType::Physical {
        multipart = multipart.text("stock_quantity", form.stock_quantity.to_string());
    }
    if updating {
        multipart = multipart.text("is_active", form.is_active.to_string());
    }
    if let Some(upload) = cover_image {
        multipart = multipart.part("cover_image", upload.into_part()?);
    }
    if let Some(upload) = digital_file {
        multipart = multipart.part("digital_file", upload.into_part()?);
    }
    Ok(multipart)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_skip_blank() {
        let query = ProductQuery {
            q: Some("  ".to_string()),
            category: Some("Tools".to_string()),
            product_type: Some(ProductType::Digital),
        };
        assert_eq!(
            query.params(),
            vec![("category", "Tools".to_string()), ("type", "digital".to_string())]
        );
        assert_eq!(query.cache_key(), "products:category=Tools&type=digital");
        assert_eq!(ProductQuery::default().cache_key(), "products:");
    }
}
