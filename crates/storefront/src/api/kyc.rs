//! Product KYC and business upgrade endpoints.

use reqwest::Method;
use reqwest::multipart::Form;
use secrecy::SecretString;
use tracing::instrument;

use diag_wheels_core::KycId;
use diag_wheels_core::validation::{BusinessUpgradeForm, ProductKycForm};

use super::types::{ProductKyc, RejectKycRequest};
use super::{ApiClient, ApiError, Body, Upload};

impl ApiClient {
    /// The user's KYC record, if one was ever submitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn my_product_kyc(&self, token: &SecretString) -> Result<Option<ProductKyc>, ApiError> {
        match self
            .send::<ProductKyc>(Method::GET, "product-kyc/me", &[], Body::Empty, Some(token))
            .await
        {
            Ok(envelope) => Ok(envelope.data),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Submit (or resubmit) product KYC with its documents.
    ///
    /// # Errors
    ///
    /// Returns an error if an upload is malformed or the backend rejects
    /// the submission.
    #[instrument(skip_all, fields(id_proofs = id_proofs.len(), business_proofs = business_proofs.len()))]
    pub async fn submit_product_kyc(
        &self,
        token: &SecretString,
        form: &ProductKycForm,
        id_proofs: Vec<Upload>,
        business_proofs: Vec<Upload>,
    ) -> Result<ProductKyc, ApiError> {
        let mut multipart = Form::new()
            .text("full_name", form.full_name.trim().to_string())
            .text("address", form.address.trim().to_string())
            .text("contact_number", form.contact_number.trim().to_string())
            .text("whatsapp_number", form.whatsapp_number.trim().to_string());
        for upload in id_proofs {
            multipart = multipart.part("id_proofs", upload.into_part()?);
        }
        for upload in business_proofs {
            multipart = multipart.part("business_proofs", upload.into_part()?);
        }

        self.post_multipart(Method::POST, "product-kyc", multipart, token)
            .await
    }

    /// Upgrade a student account to business owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is malformed or the backend refuses.
    #[instrument(skip_all, fields(has_proof = proof.is_some()))]
    pub async fn upgrade_to_business(
        &self,
        token: &SecretString,
        form: &BusinessUpgradeForm,
        proof: Option<Upload>,
    ) -> Result<Option<String>, ApiError> {
        let mut multipart = Form::new()
            .text("business_id", form.business_id.trim().to_string())
            .text(
                "business_location_link",
                form.business_location_link.trim().to_string(),
            );
        if let Some(upload) = proof {
            multipart = multipart.part("business_proof", upload.into_part()?);
        }

        self.acknowledge(
            Method::POST,
            "kyc/upgrade-to-business",
            Body::Multipart(multipart),
            Some(token),
        )
        .await
    }

    /// All KYC submissions, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token))]
    pub async fn admin_list_kyc(
        &self,
        token: &SecretString,
        status: Option<&str>,
    ) -> Result<Vec<ProductKyc>, ApiError> {
        let params: Vec<(&str, String)> = status
            .filter(|s| !s.is_empty())
            .map(|s| vec![("status", s.to_string())])
            .unwrap_or_default();
        self.get("product-kyc/admin/all", &params, Some(token)).await
    }

    /// One KYC submission.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    #[instrument(skip(self, token))]
    pub async fn admin_get_kyc(&self, token: &SecretString, id: &KycId) -> Result<ProductKyc, ApiError> {
        let path = format!("product-kyc/admin/{id}");
        self.get(&path, &[], Some(token)).await
    }

    /// Mark a submission verified.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip(self, token))]
    pub async fn admin_verify_kyc(&self, token: &SecretString, id: &KycId) -> Result<(), ApiError> {
        let path = format!("product-kyc/admin/{id}/verify");
        self.acknowledge(Method::PUT, &path, Body::Empty, Some(token))
            .await
            .map(|_| ())
    }

    /// Reject a submission with a reason the user will see.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip(self, token))]
    pub async fn admin_reject_kyc(
        &self,
        token: &SecretString,
        id: &KycId,
        reason: &str,
    ) -> Result<(), ApiError> {
        let path = format!("product-kyc/admin/{id}/reject");
        let body = Body::json(&RejectKycRequest {
            rejection_reason: reason,
        })?;
        self.acknowledge(Method::PUT, &path, body, Some(token))
            .await
            .map(|_| ())
    }
}
