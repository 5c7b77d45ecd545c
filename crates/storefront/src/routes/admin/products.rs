//! Admin product editor and digital product grants.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::validation::{MAX_UPLOAD_BYTES, ProductForm};
use diag_wheels_core::{ProductId, ProductType, UserId};

use crate::api::{ApiError, GrantEntitlementRequest, Product, Upload, User, UserQuery};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{CurrentUser, Flash};
use crate::routes::context::set_flash;
use crate::routes::uploads::MultipartForm;
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

use super::finish;

/// Users offered in the grant picker.
const GRANT_PICKER_LIMIT: u32 = 200;

#[derive(Template, WebTemplate)]
#[template(path = "admin/products/index.html")]
pub struct ProductsTemplate {
    pub ctx: PageContext,
    pub products: Vec<Product>,
}

/// Create and edit form. `product` is set when editing.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products/form.html")]
pub struct ProductFormTemplate {
    pub ctx: PageContext,
    pub product: Option<Product>,
    pub form: ProductForm,
    pub error: Option<String>,
    /// Grant picker, filled for digital products being edited.
    pub users: Vec<User>,
}

impl ProductFormTemplate {
    /// Form action URL.
    pub fn action(&self) -> String {
        self.product
            .as_ref()
            .map_or_else(|| "/admin/products".to_string(), |p| format!("/admin/products/{}", p.id))
    }
}

/// Editor fields for an existing product.
fn form_for(product: &Product) -> ProductForm {
    ProductForm {
        name: product.name.clone(),
        slug: product.slug.clone(),
        description: product.description.clone().unwrap_or_default(),
        category: product.category_path().join(" > "),
        product_type: product.product_type,
        price: product.price,
        stock_quantity: product
            .stock_quantity
            .map_or(0, |n| u32::try_from(n.max(0)).unwrap_or(u32::MAX)),
        is_active: product.is_listed(),
    }
}

/// Read the editor fields out of a multipart body.
///
/// Numbers arrive as text, so this is done by hand rather than through
/// serde.
fn parse_form(upload: &MultipartForm) -> Result<ProductForm, String> {
    let text = |name: &str| upload.text(name).unwrap_or_default().trim().to_string();

    let price = match text("price").as_str() {
        "" => Decimal::ZERO,
        raw => Decimal::from_str(raw).map_err(|_| "Price must be a number".to_string())?,
    };
    if price.is_sign_negative() {
        return Err("Price cannot be negative".to_string());
    }
    let stock_quantity = match text("stock_quantity").as_str() {
        "" => 0,
        raw => raw
            .parse()
            .map_err(|_| "Stock quantity must be a whole number".to_string())?,
    };
    let product_type = match text("product_type").as_str() {
        "digital" => ProductType::Digital,
        _ => ProductType::Physical,
    };

    Ok(ProductForm {
        name: text("name"),
        slug: text("slug"),
        description: text("description"),
        category: text("category"),
        product_type,
        price,
        stock_quantity,
        is_active: upload.checked("is_active"),
    })
}

fn check_cover(cover: Option<&Upload>) -> Result<(), String> {
    match cover {
        Some(file) if !file.content_type.starts_with("image/") => {
            Err("Cover image must be an image file".to_string())
        }
        Some(file) if file.bytes.len() > MAX_UPLOAD_BYTES => {
            Err("Cover image must be less than 10MB".to_string())
        }
        _ => Ok(()),
    }
}

async fn find_product(state: &AppState, admin: &CurrentUser, id: &ProductId) -> Result<Product, AppError> {
    state
        .api()
        .admin_list_products(&admin.token())
        .await?
        .into_iter()
        .find(|p| &p.id == id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

async fn grant_picker(state: &AppState, admin: &CurrentUser, product: &Product) -> Result<Vec<User>, AppError> {
    if product.product_type != ProductType::Digital {
        return Ok(Vec::new());
    }
    let query = UserQuery {
        page: 1,
        limit: GRANT_PICKER_LIMIT,
        ..UserQuery::default()
    };
    Ok(or_default(state.api().admin_users(&admin.token(), &query).await, "users")?.users)
}

// =============================================================================
// Handlers
// =============================================================================

/// List every product, including inactive ones.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let products = or_default(state.api().admin_list_products(&admin.token()).await, "products")?;
    Ok(ProductsTemplate { ctx, products })
}

/// Display the create form.
pub async fn new(ctx: PageContext, RequireAdmin(_admin): RequireAdmin) -> impl IntoResponse {
    ProductFormTemplate {
        ctx,
        product: None,
        form: ProductForm::default(),
        error: None,
        users: Vec::new(),
    }
}

/// Create a product.
///
/// # Errors
///
/// Returns an error for malformed multipart bodies or an expired session.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload = MultipartForm::read(multipart).await?;
    let cover = upload.take_file("cover_image");
    let digital = upload.take_file("digital_file");

    let rerender = |ctx, form, error: String| ProductFormTemplate {
        ctx,
        product: None,
        form,
        error: Some(error),
        users: Vec::new(),
    };

    let form = match parse_form(&upload) {
        Ok(form) => form,
        Err(error) => return Ok(rerender(ctx, ProductForm::default(), error).into_response()),
    };
    let checked = form
        .validate(true, digital.as_ref().map(|d| d.file_name.as_str()))
        .map_err(|e| e.to_string())
        .and_then(|()| check_cover(cover.as_ref()));
    if let Err(error) = checked {
        return Ok(rerender(ctx, form, error).into_response());
    }

    match state
        .api()
        .admin_create_product(&admin.token(), &form, cover, digital)
        .await
    {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product created");
            set_flash(&session, Flash::success(format!("Created {}", product.name))).await;
            Ok(Redirect::to("/admin/products").into_response())
        }
        Err(ApiError::SessionExpired) => Err(ApiError::SessionExpired.into()),
        Err(e) => {
            tracing::warn!("Create product failed: {e}");
            Ok(rerender(ctx, form, e.user_message()).into_response())
        }
    }
}

/// Display the edit form.
///
/// # Errors
///
/// Returns 404 for unknown products.
#[instrument(skip(state, ctx, admin), fields(admin_id = %admin.id))]
pub async fn edit(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, AppError> {
    let product = find_product(&state, &admin, &id).await?;
    let users = grant_picker(&state, &admin, &product).await?;
    Ok(ProductFormTemplate {
        ctx,
        form: form_for(&product),
        product: Some(product),
        error: None,
        users,
    })
}

/// Update a product. Files left empty keep the current ones.
///
/// # Errors
///
/// Returns an error for malformed multipart bodies, unknown products, or an
/// expired session.
#[instrument(skip(state, session, ctx, admin, multipart), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload = MultipartForm::read(multipart).await?;
    let cover = upload.take_file("cover_image");
    let digital = upload.take_file("digital_file");

    let checked = parse_form(&upload).and_then(|form| {
        form.validate(false, digital.as_ref().map(|d| d.file_name.as_str()))
            .map_err(|e| e.to_string())
            .and_then(|()| check_cover(cover.as_ref()))
            .map(|()| form)
    });

    let (form, error) = match checked {
        Ok(form) => match state
            .api()
            .admin_update_product(&admin.token(), &id, &form, cover, digital)
            .await
        {
            Ok(product) => {
                tracing::info!(product_id = %product.id, "Product updated");
                set_flash(&session, Flash::success("Product updated.")).await;
                return Ok(Redirect::to(&format!("/admin/products/{id}")).into_response());
            }
            Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
            Err(e) => {
                tracing::warn!("Update product failed: {e}");
                (Some(form), e.user_message())
            }
        },
        Err(error) => (None, error),
    };

    let product = find_product(&state, &admin, &id).await?;
    let users = grant_picker(&state, &admin, &product).await?;
    Ok(ProductFormTemplate {
        ctx,
        form: form.unwrap_or_else(|| form_for(&product)),
        product: Some(product),
        error: Some(error),
        users,
    }
    .into_response())
}

/// Delete a product.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Response, AppError> {
    let result = state.api().admin_delete_product(&admin.token(), &id).await;
    finish(&session, result, "Product deleted.", "/admin/products").await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GrantForm {
    pub user_id: String,
    pub note: String,
}

/// Give a user free access to a digital product.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn grant(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Form(form): Form<GrantForm>,
) -> Result<Response, AppError> {
    let back = format!("/admin/products/{id}");
    let user_id = form.user_id.trim();
    if user_id.is_empty() {
        set_flash(&session, Flash::error("Choose a user to grant access to.")).await;
        return Ok(Redirect::to(&back).into_response());
    }

    let request = GrantEntitlementRequest {
        user_id: UserId::new(user_id),
        product_id: id,
        note: Some(form.note.trim().to_string()).filter(|n| !n.is_empty()),
    };
    let result = state.api().admin_grant_entitlement(&admin.token(), &request).await;
    finish(&session, result, "Access granted.", &back).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_form_fields() {
        let upload = MultipartForm::default()
            .with_field("name", " OBD-II Scanner ")
            .with_field("price", "2499.50")
            .with_field("stock_quantity", "12")
            .with_field("product_type", "physical")
            .with_field("category", "Tools > OBD")
            .with_field("is_active", "on");
        let form = parse_form(&upload).unwrap();
        assert_eq!(form.name, "OBD-II Scanner");
        assert_eq!(form.price, Decimal::new(249_950, 2));
        assert_eq!(form.stock_quantity, 12);
        assert!(form.is_active);
        assert_eq!(form.categories(), ["Tools", "OBD"]);
    }

    #[test]
    fn test_parse_form_rejects_bad_numbers() {
        let bad_price = MultipartForm::default().with_field("price", "abc");
        assert_eq!(parse_form(&bad_price).unwrap_err(), "Price must be a number");

        let negative = MultipartForm::default().with_field("price", "-5");
        assert!(parse_form(&negative).is_err());

        let bad_stock = MultipartForm::default().with_field("stock_quantity", "2.5");
        assert!(parse_form(&bad_stock).is_err());
    }

    #[test]
    fn test_unticked_checkbox_deactivates() {
        let upload = MultipartForm::default().with_field("name", "Wiring Guide");
        assert!(!parse_form(&upload).unwrap().is_active);
    }

    #[test]
    fn test_cover_must_be_image() {
        let pdf = Upload {
            file_name: "cover.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![1],
        };
        assert!(check_cover(Some(&pdf)).is_err());
        assert!(check_cover(None).is_ok());
    }

    #[test]
    fn test_edit_form_from_product() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "name": "ECU Remap Pack",
            "slug": "ecu-remap-pack",
            "price": "999.00",
            "type": "digital",
            "categories": ["Software", "Tuning"],
            "is_active": false,
            "stock_quantity": -3
        }))
        .unwrap();
        let form = form_for(&product);
        assert_eq!(form.category, "Software > Tuning");
        assert_eq!(form.product_type, ProductType::Digital);
        assert_eq!(form.stock_quantity, 0);
        assert!(!form.is_active);
    }
}
