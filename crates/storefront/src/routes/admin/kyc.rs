//! Product KYC review.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::KycId;

use crate::api::ProductKyc;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::routes::context::set_flash;
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

use super::finish;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KycListQuery {
    pub status: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/kyc/index.html")]
pub struct KycListTemplate {
    pub ctx: PageContext,
    pub submissions: Vec<ProductKyc>,
    pub status: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/kyc/show.html")]
pub struct KycShowTemplate {
    pub ctx: PageContext,
    pub kyc: ProductKyc,
}

/// List submissions, optionally by status.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, ctx, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<KycListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = query.status.trim().to_string();
    let submissions = or_default(
        state.api().admin_list_kyc(&admin.token(), Some(&status)).await,
        "KYC submissions",
    )?;
    Ok(KycListTemplate {
        ctx,
        submissions,
        status,
    })
}

/// Display one submission with its documents.
///
/// # Errors
///
/// Returns 404 for unknown submissions.
#[instrument(skip(state, ctx, admin), fields(admin_id = %admin.id))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<KycId>,
) -> Result<impl IntoResponse, AppError> {
    let mut kyc = state.api().admin_get_kyc(&admin.token(), &id).await?;
    for proof in kyc.id_proofs.iter_mut().chain(kyc.business_proofs.iter_mut()) {
        *proof = state.api().asset_url(proof);
    }
    Ok(KycShowTemplate { ctx, kyc })
}

/// Mark a submission verified.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<KycId>,
) -> Result<Response, AppError> {
    let result = state.api().admin_verify_kyc(&admin.token(), &id).await;
    finish(&session, result, "KYC verified.", &format!("/admin/kyc/{id}")).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RejectForm {
    pub reason: String,
}

/// Reject a submission. The reason is shown to the user.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn reject(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<KycId>,
    Form(form): Form<RejectForm>,
) -> Result<Response, AppError> {
    let back = format!("/admin/kyc/{id}");
    let reason = form.reason.trim();
    if reason.is_empty() {
        set_flash(&session, Flash::error("A rejection reason is required.")).await;
        return Ok(Redirect::to(&back).into_response());
    }
    let result = state.api().admin_reject_kyc(&admin.token(), &id, reason).await;
    finish(&session, result, "KYC rejected.", &back).await
}
