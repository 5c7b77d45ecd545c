//! Form validation shared by the storefront and admin pages.
//!
//! Everything here is pure: handlers deserialize a form, call into this
//! module, and re-render the form with the returned messages on failure.

mod forms;
mod password;
mod upload;

pub use forms::{
    BusinessUpgradeForm, CheckoutForm, FormError, ProductForm, ProductKycForm,
    MIN_ID_PROOFS, generate_slug,
};
pub use password::{MIN_PASSWORD_LENGTH, PasswordError, validate_password, validate_password_pair};
pub use upload::{ALLOWED_PROOF_TYPES, MAX_UPLOAD_BYTES, UploadError, validate_digital_file, validate_upload};

use crate::types::Email;

/// Structural email check used by every form with an email field.
#[must_use]
pub fn is_valid_email(input: &str) -> bool {
    Email::parse(input).is_ok()
}

/// Per-field error messages, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{} field(s) failed validation", .0.len())]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    /// No errors.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a message for `field`. The first message per field is kept.
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push((field, message.into()));
        }
    }

    /// Record `"{label} is required"` when `value` is blank.
    ///
    /// Returns whether the value was present.
    pub fn require(&mut self, field: &'static str, label: &str, value: &str) -> bool {
        let present = !value.trim().is_empty();
        if !present {
            self.insert(field, format!("{label} is required"));
        }
        present
    }

    /// Message for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    /// Whether `field` has an error.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate `(field, message)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the collected errors when any were recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.insert("email", "Email is required");
        errors.insert("email", "Invalid email address");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("email"), Some("Email is required"));
    }

    #[test]
    fn test_require_blank_values() {
        let mut errors = FieldErrors::new();
        assert!(!errors.require("city", "City", "   "));
        assert!(errors.require("state", "State", "Kerala"));
        assert_eq!(errors.get("city"), Some("City is required"));
        assert!(!errors.has("state"));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_into_result_ok_when_empty() {
        assert_eq!(FieldErrors::new().into_result(), Ok(()));
    }

    #[test]
    fn test_email_helper() {
        assert!(is_valid_email("buyer@diagwheels.in"));
        assert!(!is_valid_email("buyer@diagwheels"));
        assert!(!is_valid_email("buyer @diagwheels.in"));
    }
}
