//! Admin console endpoints: dashboard, users, announcements.
//!
//! Product, order, KYC and course request administration live next to the
//! public endpoints for the same resources.

use reqwest::Method;
use secrecy::SecretString;
use tracing::instrument;

use diag_wheels_core::{UserId, UserRole};

use super::types::{
    Announcement, DashboardStats, LoginDetails, NewAnnouncement, NewUser, RequestPage, User,
    UserPage, UserUpdate,
};
use super::{ApiClient, ApiError, Body};

/// Filters for the admin user list.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub page: u32,
    pub limit: u32,
    pub role: Option<UserRole>,
    pub search: Option<String>,
}

impl UserQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.max(1).to_string()),
            ("limit", if self.limit == 0 { 50 } else { self.limit }.to_string()),
        ];
        if let Some(role) = self.role {
            params.push(("role", role.as_str().to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        params
    }
}

impl ApiClient {
    /// Headline counts for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn admin_dashboard(&self, token: &SecretString) -> Result<DashboardStats, ApiError> {
        self.get("admin/dashboard", &[], Some(token)).await
    }

    /// A page of users.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token))]
    pub async fn admin_users(&self, token: &SecretString, query: &UserQuery) -> Result<UserPage, ApiError> {
        self.get("admin/users", &query.params(), Some(token)).await
    }

    /// A page of course requests by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token))]
    pub async fn admin_requests(
        &self,
        token: &SecretString,
        page: u32,
        status: Option<&str>,
    ) -> Result<RequestPage, ApiError> {
        let mut params = vec![("page", page.max(1).to_string()), ("limit", "50".to_string())];
        if let Some(status) = status.filter(|s| !s.is_empty()) {
            params.push(("status", status.to_string()));
        }
        self.get("admin/requests", &params, Some(token)).await
    }

    /// Create an account on someone's behalf.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] if the email is taken.
    #[instrument(skip_all, fields(email = %user.email))]
    pub async fn admin_create_user(&self, token: &SecretString, user: &NewUser<'_>) -> Result<User, ApiError> {
        self.post_json("admin/users", user, Some(token)).await
    }

    /// Update names, role, active flag, and optionally the password.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip(self, token, update))]
    pub async fn admin_update_user(
        &self,
        token: &SecretString,
        id: &UserId,
        update: &UserUpdate<'_>,
    ) -> Result<User, ApiError> {
        let path = format!("admin/users/{id}");
        self.put_json(&path, update, Some(token)).await
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip(self, token))]
    pub async fn admin_delete_user(&self, token: &SecretString, id: &UserId) -> Result<(), ApiError> {
        let path = format!("admin/users/{id}");
        self.acknowledge(Method::DELETE, &path, Body::Empty, Some(token))
            .await
            .map(|_| ())
    }

    /// Sessions and login history for one user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    #[instrument(skip(self, token))]
    pub async fn admin_login_details(&self, token: &SecretString, id: &UserId) -> Result<LoginDetails, ApiError> {
        let path = format!("admin/users/{id}/login-details");
        self.get(&path, &[], Some(token)).await
    }

    /// Announcements, optionally only active ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token))]
    pub async fn admin_announcements(
        &self,
        token: &SecretString,
        is_active: Option<bool>,
    ) -> Result<Vec<Announcement>, ApiError> {
        let params: Vec<(&str, String)> = is_active
            .map(|active| vec![("is_active", active.to_string())])
            .unwrap_or_default();
        self.get("admin/announcements", &params, Some(token)).await
    }

    /// Publish an announcement.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip_all, fields(title = %announcement.title))]
    pub async fn admin_create_announcement(
        &self,
        token: &SecretString,
        announcement: &NewAnnouncement,
    ) -> Result<(), ApiError> {
        self.acknowledge(
            Method::POST,
            "admin/announcements",
            Body::json(announcement)?,
            Some(token),
        )
        .await
        .map(|_| ())
    }
}
