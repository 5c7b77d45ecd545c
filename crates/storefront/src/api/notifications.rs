//! In-app notifications and web push registration.

use reqwest::Method;
use secrecy::SecretString;
use serde_json::json;
use tracing::instrument;

use diag_wheels_core::NotificationId;

use super::types::{NotificationList, PushSubscription};
use super::{ApiClient, ApiError, Body};

impl ApiClient {
    /// A page of notifications plus the unread count.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token))]
    pub async fn notifications(
        &self,
        token: &SecretString,
        limit: u32,
        offset: u32,
        unread_only: bool,
    ) -> Result<NotificationList, ApiError> {
        let params = [
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("unread_only", unread_only.to_string()),
        ];
        self.get("notifications", &params, Some(token)).await
    }

    /// Mark one notification read.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip(self, token))]
    pub async fn mark_notification_read(
        &self,
        token: &SecretString,
        id: &NotificationId,
    ) -> Result<(), ApiError> {
        let path = format!("notifications/{id}/read");
        self.acknowledge(Method::PUT, &path, Body::Empty, Some(token))
            .await
            .map(|_| ())
    }

    /// Mark every notification read.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip_all)]
    pub async fn mark_all_notifications_read(&self, token: &SecretString) -> Result<(), ApiError> {
        self.acknowledge(Method::PUT, "notifications/read-all", Body::Empty, Some(token))
            .await
            .map(|_| ())
    }

    /// Register this browser for push delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip_all)]
    pub async fn push_subscribe(
        &self,
        token: &SecretString,
        subscription: &PushSubscription,
    ) -> Result<(), ApiError> {
        self.acknowledge(
            Method::POST,
            "notifications/push/subscribe",
            Body::json(subscription)?,
            Some(token),
        )
        .await
        .map(|_| ())
    }

    /// Stop push delivery to an endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip_all)]
    pub async fn push_unsubscribe(&self, token: &SecretString, endpoint: &str) -> Result<(), ApiError> {
        self.acknowledge(
            Method::POST,
            "notifications/push/unsubscribe",
            Body::json(&json!({ "endpoint": endpoint }))?,
            Some(token),
        )
        .await
        .map(|_| ())
    }
}
