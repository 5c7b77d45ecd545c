//! Session-related types.
//!
//! Types stored in the session for authentication state and one-shot
//! messages shown after a redirect.

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use diag_wheels_core::{UserId, UserRole, UserType};

use crate::api::User;

/// Session-stored user identity.
///
/// Holds the backend bearer token; the token is never logged.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    pub user_type: Option<UserType>,
    access_token: String,
}

impl CurrentUser {
    /// Build the session identity from a login/register response.
    #[must_use]
    pub fn new(user: &User, access_token: String) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            user_type: user.user_type,
            access_token,
        }
    }

    /// Refresh the cached profile fields, keeping the token.
    pub fn refresh(&mut self, user: &User) {
        self.email.clone_from(&user.email);
        self.first_name.clone_from(&user.first_name);
        self.last_name.clone_from(&user.last_name);
        self.role = user.role;
        self.user_type = user.user_type;
    }

    /// Bearer token for backend calls.
    #[must_use]
    pub fn token(&self) -> SecretString {
        SecretString::from(self.access_token.clone())
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    #[must_use]
    pub fn is_business_owner(&self) -> bool {
        self.user_type == Some(UserType::BusinessOwner)
    }

    /// First name, or the email when no name is on file.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }

    /// Avatar letter for the header.
    #[must_use]
    pub fn initial(&self) -> String {
        self.display_name()
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("user_type", &self.user_type)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Banner style for a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the shopping cart.
    pub const CART: &str = "cart";

    /// Key for the pending one-shot message.
    pub const FLASH: &str = "flash";

    /// Key for the order awaiting payment confirmation.
    pub const PENDING_ORDER: &str = "pending_order";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": "u-1",
            "email": "asha@example.com",
            "first_name": "asha",
            "role": "admin",
            "user_type": "business_owner"
        }))
        .unwrap()
    }

    #[test]
    fn test_debug_redacts_token() {
        let current = CurrentUser::new(&user(), "secret-token".to_string());
        let debug = format!("{current:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(current.token().expose_secret(), "secret-token");
    }

    #[test]
    fn test_roles_and_names() {
        let current = CurrentUser::new(&user(), "t".to_string());
        assert!(current.is_admin());
        assert!(current.is_business_owner());
        assert_eq!(current.display_name(), "asha");
        assert_eq!(current.initial(), "A");
    }

    #[test]
    fn test_session_roundtrip_keeps_token() {
        let current = CurrentUser::new(&user(), "t-123".to_string());
        let json = serde_json::to_string(&current).unwrap();
        let back: CurrentUser = serde_json::from_str(&json).unwrap();
        assert_eq!(back.token().expose_secret(), "t-123");
    }
}
