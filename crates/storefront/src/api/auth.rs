//! Authentication and profile endpoints.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::instrument;

use super::types::{AuthSession, ProfileUpdate, RegisterRequest, User};
use super::{ApiClient, ApiError, Body};

impl ApiClient {
    /// Exchange credentials for a backend token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] with the backend message for bad
    /// credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<AuthSession, ApiError> {
        self.post_json(
            "auth/login",
            &json!({ "email": email, "password": password.expose_secret() }),
            None,
        )
        .await
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] when the backend refuses the
    /// registration (e.g. email already taken).
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<AuthSession, ApiError> {
        self.post_json("auth/register", request, None).await
    }

    /// Revoke the backend token. Failures are not fatal to a local logout.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &SecretString) -> Result<(), ApiError> {
        self.acknowledge(Method::POST, "auth/logout", Body::Empty, Some(token))
            .await
            .map(|_| ())
    }

    /// The signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SessionExpired`] if the token is no longer valid.
    #[instrument(skip_all)]
    pub async fn profile(&self, token: &SecretString) -> Result<User, ApiError> {
        self.get("auth/profile", &[], Some(token)).await
    }

    /// Update name and phone.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip_all)]
    pub async fn update_profile(
        &self,
        token: &SecretString,
        update: &ProfileUpdate,
    ) -> Result<User, ApiError> {
        self.put_json("auth/profile", update, Some(token)).await
    }

    /// Ask the backend to email a reset link.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(
            Method::POST,
            "auth/forgot-password",
            Body::json(&json!({ "email": email }))?,
            None,
        )
        .await
    }

    /// Set a new password using the emailed token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] for an invalid or expired token.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        reset_token: &str,
        password: &SecretString,
    ) -> Result<Option<String>, ApiError> {
        self.acknowledge(
            Method::POST,
            "auth/reset-password",
            Body::json(&json!({ "token": reset_token, "password": password.expose_secret() }))?,
            None,
        )
        .await
    }
}
