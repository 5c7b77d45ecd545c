//! Password policy for registration and reset.

use super::FieldErrors;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// The first password rule that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("Password is required")]
    Required,
    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    TooShort,
    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("Password must contain at least one number")]
    MissingDigit,
}

/// Check a password against the policy, reporting the first failing rule.
///
/// # Errors
///
/// Returns the first rule the password breaks.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Required);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordError::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::MissingDigit);
    }
    Ok(())
}

/// Validate a password and its confirmation.
///
/// Errors are keyed `password` and `confirm_password`.
///
/// # Errors
///
/// Returns the per-field messages when either field is invalid.
pub fn validate_password_pair(password: &str, confirm: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if let Err(e) = validate_password(password) {
        errors.insert("password", e.to_string());
    }

    if confirm.is_empty() {
        errors.insert("confirm_password", "Please confirm your password");
    } else if confirm != password {
        errors.insert("confirm_password", "Passwords do not match");
    }

    errors.into_result()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_in_order() {
        assert_eq!(validate_password(""), Err(PasswordError::Required));
        assert_eq!(validate_password("Ab1"), Err(PasswordError::TooShort));
        assert_eq!(
            validate_password("ABCDEFG1"),
            Err(PasswordError::MissingLowercase)
        );
        assert_eq!(
            validate_password("abcdefg1"),
            Err(PasswordError::MissingUppercase)
        );
        assert_eq!(
            validate_password("Abcdefgh"),
            Err(PasswordError::MissingDigit)
        );
        assert_eq!(validate_password("Abcdefg1"), Ok(()));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            PasswordError::TooShort.to_string(),
            "Password must be at least 8 characters"
        );
    }

    #[test]
    fn test_pair_requires_confirmation() {
        let errors = validate_password_pair("Abcdefg1", "").unwrap_err();
        assert_eq!(
            errors.get("confirm_password"),
            Some("Please confirm your password")
        );
        assert!(!errors.has("password"));
    }

    #[test]
    fn test_pair_mismatch() {
        let errors = validate_password_pair("Abcdefg1", "Abcdefg2").unwrap_err();
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
    }

    #[test]
    fn test_pair_reports_both_fields() {
        let errors = validate_password_pair("short", "").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 8 characters")
        );
    }

    #[test]
    fn test_pair_ok() {
        assert!(validate_password_pair("Abcdefg1", "Abcdefg1").is_ok());
    }
}
