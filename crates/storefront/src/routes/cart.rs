//! Cart route handlers.
//!
//! The cart is held in the session as product snapshots (see
//! [`crate::models::Cart`]); nothing is sent to the backend until checkout.
//! Mutations are HTMX requests that answer with a fragment and an
//! `HX-Trigger: cart-updated` header so the header badge refreshes itself.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::ProductId;
use diag_wheels_core::pricing::CartTotals;

use crate::api::ApiError;
use crate::error::AppError;
use crate::filters;
use crate::models::{Cart, Flash};
use crate::routes::PageContext;
use crate::routes::context::{load_cart, save_cart, set_flash};
use crate::state::AppState;

const CART_UPDATED: (&str, &str) = ("HX-Trigger", "cart-updated");

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub slug: String,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub ctx: PageContext,
    pub cart: Cart,
    pub totals: CartTotals,
}

/// Cart lines and totals fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "cart/_items.html")]
pub struct CartItemsTemplate {
    pub cart: Cart,
    pub totals: CartTotals,
}

impl CartItemsTemplate {
    fn new(cart: Cart) -> Self {
        let totals = cart.totals();
        Self { cart, totals }
    }
}

/// Add-to-cart result message (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "cart/_added.html")]
pub struct CartAddedTemplate {
    pub ok: bool,
    pub message: String,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "cart/_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display cart page.
#[instrument(skip(session, ctx))]
pub async fn show(session: Session, ctx: PageContext) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    let totals = cart.totals();
    CartShowTemplate { ctx, cart, totals }
}

/// Add a product to the cart.
///
/// HTMX requests get a status message; plain form posts are redirected to
/// the cart with a flash message.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let htmx = headers.contains_key("HX-Request");
    let quantity = form.quantity.unwrap_or(1).max(1);

    let outcome = match state.api().product_by_slug(&form.slug).await {
        Ok(product) => {
            let mut cart = load_cart(&session).await;
            match cart.add(&product, quantity) {
                Ok(()) => {
                    save_cart(&session, &cart).await?;
                    tracing::info!(product = %product.id, quantity, "Added to cart");
                    Ok(format!("{} added to cart", product.name))
                }
                Err(e) => Err(e.to_string()),
            }
        }
        Err(ApiError::NotFound(_)) => Err("This product is no longer available".to_string()),
        Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
        Err(e) => {
            tracing::error!("Failed to load product for cart: {e}");
            Err(e.user_message())
        }
    };

    if !htmx {
        let flash = match &outcome {
            Ok(message) => Flash::success(message.clone()),
            Err(message) => Flash::error(message.clone()),
        };
        set_flash(&session, flash).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    Ok(match outcome {
        Ok(message) => (
            AppendHeaders([CART_UPDATED]),
            CartAddedTemplate { ok: true, message },
        )
            .into_response(),
        Err(message) => CartAddedTemplate { ok: false, message }.into_response(),
    })
}

/// Update cart line quantity (HTMX). Zero removes the line.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await;
    if cart.set_quantity(&form.product_id, form.quantity) {
        save_cart(&session, &cart).await?;
    }
    Ok((AppendHeaders([CART_UPDATED]), CartItemsTemplate::new(cart)).into_response())
}

/// Remove a cart line (HTMX).
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await;
    if cart.remove(&form.product_id) {
        save_cart(&session, &cart).await?;
    }
    Ok((AppendHeaders([CART_UPDATED]), CartItemsTemplate::new(cart)).into_response())
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: load_cart(&session).await.item_count(),
    }
}

/// Create the cart routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show))
        .route("/add", post(add))
        .route("/update", post(update))
        .route("/remove", post(remove))
        .route("/count", get(count))
}
