//! KYC route handlers: product KYC submission and the student to business
//! owner upgrade.
//!
//! Both forms are multipart; documents are checked here for type and size
//! before they are forwarded to the backend.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::instrument;

use diag_wheels_core::validation::{BusinessUpgradeForm, FormError, MIN_ID_PROOFS, ProductKycForm};
use diag_wheels_core::{KycStatus, UserType};

use crate::api::{ApiError, ProductKyc};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{CurrentUser, Flash};
use crate::routes::context::set_flash;
use crate::routes::uploads::{MultipartForm, body_limit, validate_proofs};
use crate::routes::{PageContext, or_default};
use crate::state::AppState;

/// Product KYC page template.
#[derive(Template, WebTemplate)]
#[template(path = "kyc/product.html")]
pub struct ProductKycTemplate {
    pub ctx: PageContext,
    /// The record on file, if any.
    pub existing: Option<ProductKyc>,
    pub form: ProductKycForm,
    pub error: Option<String>,
    pub min_id_proofs: usize,
    /// Whether the business upgrade form is offered.
    pub can_upgrade: bool,
}

impl ProductKycTemplate {
    pub fn can_submit(&self) -> bool {
        may_submit(self.existing.as_ref())
    }
}

/// Whether the user may (re)submit: nothing on file, or rejected.
fn may_submit(existing: Option<&ProductKyc>) -> bool {
    existing.is_none_or(|kyc| kyc.status == KycStatus::Rejected)
}

/// Why a submission over the record on file is refused.
fn resubmit_refusal(status: KycStatus) -> &'static str {
    if status == KycStatus::Verified {
        "Your KYC is already verified."
    } else {
        "Your KYC is already under review. You can resubmit only if it is rejected."
    }
}

/// Form prefill from the record on file.
fn prefill(existing: Option<&ProductKyc>, user: &CurrentUser) -> ProductKycForm {
    existing.map_or_else(
        || ProductKycForm {
            full_name: user.display_name().to_string(),
            ..ProductKycForm::default()
        },
        |kyc| ProductKycForm {
            full_name: kyc.full_name.clone(),
            address: kyc.address.clone(),
            contact_number: kyc.contact_number.clone(),
            whatsapp_number: kyc.whatsapp_number.clone(),
        },
    )
}

fn can_upgrade(user: &CurrentUser) -> bool {
    user.user_type == Some(UserType::Student)
}

/// Make stored proof paths absolute so the page can link to them.
fn absolute_proofs(state: &AppState, kyc: &mut ProductKyc) {
    for proof in kyc.id_proofs.iter_mut().chain(kyc.business_proofs.iter_mut()) {
        *proof = state.api().asset_url(proof);
    }
}

/// Display the product KYC form and any record on file.
///
/// # Errors
///
/// Returns an error only if the session expired mid-request.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let mut existing = or_default(state.api().my_product_kyc(&user.token()).await, "product KYC")?;
    if let Some(kyc) = existing.as_mut() {
        absolute_proofs(&state, kyc);
    }

    Ok(ProductKycTemplate {
        form: prefill(existing.as_ref(), &user),
        ctx,
        existing,
        error: None,
        min_id_proofs: MIN_ID_PROOFS,
        can_upgrade: can_upgrade(&user),
    })
}

/// Submit product KYC with its documents.
///
/// # Errors
///
/// Returns an error for malformed multipart bodies or an expired session.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let token = user.token();
    let mut existing = or_default(state.api().my_product_kyc(&token).await, "product KYC")?;
    if let Some(kyc) = existing.as_ref().filter(|kyc| !may_submit(Some(*kyc))) {
        tracing::warn!(status = kyc.status.as_str(), "Product KYC resubmission refused");
        set_flash(&session, Flash::error(resubmit_refusal(kyc.status))).await;
        return Ok(Redirect::to("/kyc/product").into_response());
    }

    let mut upload = MultipartForm::read(multipart).await?;
    let form: ProductKycForm = upload.fields()?;
    let id_proofs = upload.take_files("id_proofs");
    let business_proofs = upload.take_files("business_proofs");

    let on_file = existing.as_ref().map_or(0, |kyc| kyc.id_proofs.len());

    let checked = form
        .validate(id_proofs.len(), on_file)
        .and_then(|()| validate_proofs(&id_proofs).map_err(FormError::from))
        .and_then(|()| validate_proofs(&business_proofs).map_err(FormError::from));

    let error = match checked {
        Err(e) => Some(e.to_string()),
        Ok(()) => match state
            .api()
            .submit_product_kyc(&token, &form, id_proofs, business_proofs)
            .await
        {
            Ok(_) => {
                tracing::info!("Product KYC submitted");
                set_flash(
                    &session,
                    Flash::success("KYC submitted. We'll notify you once it has been reviewed."),
                )
                .await;
                return Ok(Redirect::to("/kyc/product").into_response());
            }
            Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
            Err(e) => {
                tracing::warn!("Product KYC rejected: {e}");
                Some(e.user_message())
            }
        },
    };

    if let Some(kyc) = existing.as_mut() {
        absolute_proofs(&state, kyc);
    }
    Ok(ProductKycTemplate {
        ctx,
        existing,
        form,
        error,
        min_id_proofs: MIN_ID_PROOFS,
        can_upgrade: can_upgrade(&user),
    }
    .into_response())
}

/// Request the upgrade from student to business owner.
///
/// # Errors
///
/// Returns an error for malformed multipart bodies or an expired session.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn business_upgrade(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response, AppError> {
    if !can_upgrade(&user) {
        tracing::warn!("Business upgrade refused for non-student account");
        set_flash(&session, Flash::error("Only student accounts can upgrade to business owner.")).await;
        return Ok(Redirect::to("/kyc/product").into_response());
    }

    let mut upload = MultipartForm::read(multipart).await?;
    let form: BusinessUpgradeForm = upload.fields()?;
    let proof = upload.take_file("business_proof");

    let checked = form.validate().and_then(|()| {
        proof
            .as_ref()
            .map_or(Ok(()), |p| validate_proofs(std::slice::from_ref(p)))
            .map_err(FormError::from)
    });
    if let Err(e) = checked {
        set_flash(&session, Flash::error(e.to_string())).await;
        return Ok(Redirect::to("/kyc/product").into_response());
    }

    let token = user.token();
    match state.api().upgrade_to_business(&token, &form, proof).await {
        Ok(message) => {
            tracing::info!("Business upgrade requested");
            match state.api().profile(&token).await {
                Ok(profile) => {
                    let mut current = user;
                    current.refresh(&profile);
                    set_current_user(&session, &current).await?;
                }
                Err(e) => tracing::warn!("Failed to refresh profile after upgrade: {e}"),
            }
            let message = message.unwrap_or_else(|| "Your account has been upgraded to business owner.".to_string());
            set_flash(&session, Flash::success(message)).await;
        }
        Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
        Err(e) => {
            tracing::warn!("Business upgrade rejected: {e}");
            set_flash(&session, Flash::error(e.user_message())).await;
        }
    }
    Ok(Redirect::to("/kyc/product").into_response())
}

/// Create the KYC routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/product", get(show).post(submit))
        .route("/business-upgrade", post(business_upgrade))
        .layer(body_limit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kyc(status: KycStatus) -> ProductKyc {
        ProductKyc {
            id: diag_wheels_core::KycId::new("kyc-1"),
            user_id: None,
            user_email: None,
            full_name: "Asha Menon".to_string(),
            address: "12 MG Road, Kochi".to_string(),
            contact_number: "9876543210".to_string(),
            whatsapp_number: "9876543210".to_string(),
            id_proofs: vec!["/uploads/a.png".to_string(), "/uploads/b.png".to_string()],
            business_proofs: Vec::new(),
            status,
            rejection_reason: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn template(existing: Option<ProductKyc>) -> ProductKycTemplate {
        ProductKycTemplate {
            ctx: PageContext::default(),
            existing,
            form: ProductKycForm::default(),
            error: None,
            min_id_proofs: MIN_ID_PROOFS,
            can_upgrade: false,
        }
    }

    #[test]
    fn test_resubmit_only_after_rejection() {
        assert!(template(None).can_submit());
        assert!(template(Some(kyc(KycStatus::Rejected))).can_submit());
        assert!(!template(Some(kyc(KycStatus::Pending))).can_submit());
        assert!(!template(Some(kyc(KycStatus::Verified))).can_submit());
    }

    #[test]
    fn test_refusal_names_the_record_state() {
        assert_eq!(resubmit_refusal(KycStatus::Verified), "Your KYC is already verified.");
        assert!(resubmit_refusal(KycStatus::Pending).contains("under review"));
    }
}
