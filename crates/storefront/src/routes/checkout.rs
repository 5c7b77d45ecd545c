//! Checkout: shipping form, order placement and Razorpay payment.
//!
//! # Flow
//!
//! 1. `GET /checkout` shows the shipping form (product terms must be
//!    accepted first).
//! 2. `POST /checkout` validates, creates the backend order and a Razorpay
//!    order, then renders the payment page which opens the Razorpay widget.
//! 3. The widget's success handler posts the signed result to
//!    `POST /checkout/verify`; once the backend verifies the signature the
//!    cart is emptied.
//!
//! The placed order is remembered in the session until it is paid, so a
//! retry with the same cart reuses it instead of placing another.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::OrderId;
use diag_wheels_core::pricing::CartTotals;
use diag_wheels_core::validation::{CheckoutForm, FieldErrors};

use crate::api::{ApiError, CreateOrderRequest, RazorpayOrder, RazorpayVerifyRequest, ShippingAddress};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{Cart, CurrentUser, Flash, PendingOrder, session_keys};
use crate::routes::context::{load_cart, save_cart, set_flash};
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

/// Shipping form page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub cart: Cart,
    pub totals: CartTotals,
    pub form: CheckoutForm,
    pub errors: FieldErrors,
    /// Inline banner for backend failures.
    pub error: Option<String>,
    pub terms_accepted: bool,
}

/// Empty cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/empty.html")]
pub struct EmptyCartTemplate {
    pub ctx: PageContext,
}

/// Payment page template; opens the Razorpay widget.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/pay.html")]
pub struct PaymentTemplate {
    pub ctx: PageContext,
    pub key_id: String,
    pub payment: RazorpayOrder,
    pub totals: CartTotals,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub ctx: PageContext,
    pub order_id: OrderId,
    pub message: Option<String>,
    pub has_digital: bool,
}

/// Signed payment result posted by the Razorpay widget handler.
#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    pub internal_order_id: OrderId,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

fn prefill(user: &CurrentUser) -> CheckoutForm {
    CheckoutForm {
        first_name: user.first_name.clone().unwrap_or_default(),
        last_name: user.last_name.clone().unwrap_or_default(),
        email: user.email.clone(),
        ..CheckoutForm::default()
    }
}

fn shipping_address(form: &CheckoutForm) -> ShippingAddress {
    ShippingAddress {
        full_name: form.full_name(),
        email: form.email.trim().to_string(),
        phone: form.phone.trim().to_string(),
        address: form.address.trim().to_string(),
        city: form.city.trim().to_string(),
        state: form.state.trim().to_string(),
        pincode: form.pincode.trim().to_string(),
    }
}

async fn product_terms_accepted(state: &AppState, user: &CurrentUser) -> Result<bool, AppError> {
    Ok(or_default(state.api().terms_status(&user.token()).await, "terms status")?.product_terms_accepted)
}

/// Display the shipping form.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        return Ok(EmptyCartTemplate { ctx }.into_response());
    }

    let terms_accepted = product_terms_accepted(&state, &user).await?;
    let totals = cart.totals();
    Ok(CheckoutTemplate {
        ctx,
        cart,
        totals,
        form: prefill(&user),
        errors: FieldErrors::new(),
        error: None,
        terms_accepted,
    }
    .into_response())
}

/// Place the order and open the payment page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        return Ok(EmptyCartTemplate { ctx }.into_response());
    }

    let terms_accepted = product_terms_accepted(&state, &user).await?;
    let totals = cart.totals();
    let rerender = |ctx, cart, form, errors, error: Option<String>| CheckoutTemplate {
        ctx,
        cart,
        totals,
        form,
        errors,
        error,
        terms_accepted,
    };

    if !terms_accepted {
        let error = Some("Please accept the product terms before placing your order.".to_string());
        return Ok(rerender(ctx, cart, form, FieldErrors::new(), error).into_response());
    }
    if let Err(errors) = form.validate() {
        return Ok(rerender(ctx, cart, form, errors, None).into_response());
    }

    let token = user.token();
    let pending = session
        .get::<PendingOrder>(session_keys::PENDING_ORDER)
        .await?
        .filter(|pending| pending.matches(&cart));
    let order_id = if let Some(pending) = pending {
        tracing::info!(order_id = %pending.id, "Reusing unpaid order");
        pending.id
    } else {
        let request = CreateOrderRequest {
            items: cart.order_lines(),
            shipping_address: cart.has_physical().then(|| shipping_address(&form)),
        };
        let order = match state.api().create_order(&token, &request).await {
            Ok(order) => order,
            Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
            Err(e) => {
                tracing::warn!("Order rejected: {e}");
                return Ok(rerender(ctx, cart, form, FieldErrors::new(), Some(e.user_message())).into_response());
            }
        };
        tracing::info!(order_id = %order.id, total = %order.total, "Order created");
        session
            .insert(session_keys::PENDING_ORDER, PendingOrder::new(order.id.clone(), &cart))
            .await?;
        order.id
    };

    let payment = match state.api().create_razorpay_order(&token, &order_id).await {
        Ok(payment) => payment,
        Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
        Err(e) => {
            tracing::error!(order_id = %order_id, "Failed to create payment: {e}");
            let error = format!(
                "Your order was saved but payment could not be started: {}. Please try again.",
                e.user_message().trim_end_matches('.')
            );
            return Ok(rerender(ctx, cart, form, FieldErrors::new(), Some(error)).into_response());
        }
    };

    let key_id = state
        .config()
        .razorpay_key_id
        .clone()
        .unwrap_or_else(|| payment.key_id.clone());
    Ok(PaymentTemplate {
        ctx,
        key_id,
        payment,
        totals,
        name: form.full_name(),
        email: form.email.trim().to_string(),
        phone: form.phone.trim().to_string(),
    }
    .into_response())
}

/// Verify a completed payment and empty the cart.
///
/// # Errors
///
/// Returns 400 when the callback is for an order this session did not
/// start.
#[instrument(skip_all, fields(user_id = %user.id, order_id = %form.internal_order_id))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
    Form(form): Form<VerifyForm>,
) -> Result<Response, AppError> {
    let pending = session.get::<PendingOrder>(session_keys::PENDING_ORDER).await?;
    if pending.as_ref().map(|pending| &pending.id) != Some(&form.internal_order_id) {
        return Err(AppError::BadRequest(
            "This payment does not match your current order.".to_string(),
        ));
    }

    let request = RazorpayVerifyRequest {
        internal_order_id: form.internal_order_id.clone(),
        razorpay_order_id: form.razorpay_order_id,
        razorpay_payment_id: form.razorpay_payment_id,
        razorpay_signature: form.razorpay_signature,
    };

    match state.api().verify_razorpay_payment(&user.token(), &request).await {
        Ok(message) => {
            let cart = load_cart(&session).await;
            let has_digital = cart.items.iter().any(crate::models::CartItem::is_digital);
            save_cart(&session, &Cart::default()).await?;
            session.remove::<PendingOrder>(session_keys::PENDING_ORDER).await?;
            tracing::info!("Payment verified");

            let mut ctx = ctx;
            ctx.cart_count = 0;
            Ok(SuccessTemplate {
                ctx,
                order_id: form.internal_order_id,
                message,
                has_digital,
            }
            .into_response())
        }
        Err(ApiError::SessionExpired) => Err(ApiError::SessionExpired.into()),
        Err(e) => {
            tracing::warn!("Payment verification failed: {e}");
            set_flash(
                &session,
                Flash::error(format!("Payment verification failed: {}", e.user_message())),
            )
            .await;
            Ok(Redirect::to("/cart").into_response())
        }
    }
}

/// Create the checkout routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show).post(place_order))
        .route("/verify", post(verify))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_address_trims_fields() {
        let form = CheckoutForm {
            first_name: " Asha ".to_string(),
            last_name: "Menon".to_string(),
            email: " asha@example.in ".to_string(),
            phone: "9876543210".to_string(),
            address: "12 MG Road".to_string(),
            city: "Kochi".to_string(),
            state: "Kerala".to_string(),
            pincode: " 682001".to_string(),
        };
        let address = shipping_address(&form);
        assert_eq!(address.full_name, "Asha Menon");
        assert_eq!(address.email, "asha@example.in");
        assert_eq!(address.pincode, "682001");
    }
}
