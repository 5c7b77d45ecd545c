//! Admin order list and manual payment recording.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::OrderId;

use crate::api::{AdminOrderSummary, MarkPaidRequest};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

use super::finish;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrderListQuery {
    pub status: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<AdminOrderSummary>,
    pub status: String,
}

fn filter_orders(orders: Vec<AdminOrderSummary>, status: &str) -> Vec<AdminOrderSummary> {
    if status.is_empty() {
        return orders;
    }
    orders
        .into_iter()
        .filter(|o| o.status.as_str() == status)
        .collect()
}

/// List orders, optionally by status.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, ctx, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let orders = or_default(state.api().admin_orders(&admin.token()).await, "orders")?;
    let status = query.status.trim().to_string();
    Ok(OrdersTemplate {
        ctx,
        orders: filter_orders(orders, &status),
        status,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MarkPaidForm {
    pub payment_provider: String,
    pub payment_reference: String,
}

/// Blank fields fall back to provider `manual` and an `admin-<millis>`
/// reference, so one click records the payment.
fn mark_paid_request(form: &MarkPaidForm, now_millis: i64) -> MarkPaidRequest {
    let provider = match form.payment_provider.trim() {
        "" => "manual".to_string(),
        provider => provider.to_string(),
    };
    let reference = match form.payment_reference.trim() {
        "" => format!("admin-{now_millis}"),
        reference => reference.to_string(),
    };
    MarkPaidRequest {
        payment_provider: provider,
        payment_reference: reference,
    }
}

/// Record an offline payment for a pending order.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn mark_paid(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Form(form): Form<MarkPaidForm>,
) -> Result<Response, AppError> {
    let request = mark_paid_request(&form, Utc::now().timestamp_millis());
    let result = state
        .api()
        .admin_mark_order_paid(&admin.token(), &id, &request)
        .await;
    if result.is_ok() {
        tracing::info!(
            order_id = %id,
            provider = %request.payment_provider,
            reference = %request.payment_reference,
            "Order marked paid"
        );
    }
    finish(&session, result, "Order marked as paid.", "/admin/orders").await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(id: &str, status: &str) -> AdminOrderSummary {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "status": status,
            "total": "1200.00",
            "physical_items": "2",
            "digital_items": 0
        }))
        .unwrap()
    }

    #[test]
    fn test_status_filter() {
        let orders = vec![order("o1", "pending"), order("o2", "paid"), order("o3", "pending")];
        assert_eq!(filter_orders(orders.clone(), "").len(), 3);
        let pending = filter_orders(orders, "pending");
        let ids: Vec<&str> = pending.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["o1", "o3"]);
    }

    #[test]
    fn test_blank_mark_paid_form_fills_defaults() {
        let request = mark_paid_request(&MarkPaidForm::default(), 1_760_774_400_000);
        assert_eq!(request.payment_provider, "manual");
        assert_eq!(request.payment_reference, "admin-1760774400000");
    }

    #[test]
    fn test_mark_paid_form_values_are_kept() {
        let form = MarkPaidForm {
            payment_provider: " bank_transfer ".to_string(),
            payment_reference: "UTR-4471".to_string(),
        };
        let request = mark_paid_request(&form, 0);
        assert_eq!(request.payment_provider, "bank_transfer");
        assert_eq!(request.payment_reference, "UTR-4471");
    }
}
