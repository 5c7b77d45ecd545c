//! Email address type.
//!
//! The check is structural only, the same one the backend applies before it
//! sends a verification mail: something, an `@`, then a domain with a dot
//! inside it. Addresses are stored lowercased since logins are
//! case-insensitive.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string is not an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("Email is required")]
    Empty,
    #[error("Email cannot contain spaces")]
    Whitespace,
    /// Zero or several `@` signs.
    #[error("Please enter a valid email address")]
    MissingAtSymbol,
    #[error("Please enter a valid email address")]
    EmptyLocalPart,
    /// No `x.y` in the part after the `@`.
    #[error("Please enter a valid email address")]
    InvalidDomain,
}

/// A lowercased email address.
///
/// ```
/// use diag_wheels_core::Email;
///
/// let email = Email::parse(" Asha@DiagWheels.in ").unwrap();
/// assert_eq!(email.as_str(), "asha@diagwheels.in");
///
/// assert!(Email::parse("asha@localhost").is_err());
/// assert!(Email::parse("@diagwheels.in").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Parse and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns the first structural rule the input breaks.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EmailError::Empty);
        }
        if input.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let mut parts = input.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EmailError::MissingAtSymbol);
        };
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if !has_inner_dot(domain) {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(input.to_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A `.` with at least one character on each side.
fn has_inner_dot(domain: &str) -> bool {
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        for ok in [
            "asha@diagwheels.in",
            "workshop.kochi+orders@gmail.com",
            "a@b.c",
            "fleet@service.example.co.in",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok} should parse");
        }
    }

    #[test]
    fn test_lowercases_and_trims() {
        let email = Email::parse("  Ravi.K@Garage.IN\n").unwrap();
        assert_eq!(email.to_string(), "ravi.k@garage.in");
    }

    #[test]
    fn test_rejects_by_rule() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        assert_eq!(Email::parse("ravi k@garage.in"), Err(EmailError::Whitespace));
        assert_eq!(Email::parse("garage.in"), Err(EmailError::MissingAtSymbol));
        assert_eq!(Email::parse("a@b@garage.in"), Err(EmailError::MissingAtSymbol));
        assert_eq!(Email::parse("@garage.in"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("ravi@garage"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("ravi@.in"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("ravi@garage."), Err(EmailError::InvalidDomain));
    }

    #[test]
    fn test_user_facing_message() {
        assert_eq!(
            Email::parse("ravi@garage").unwrap_err().to_string(),
            "Please enter a valid email address"
        );
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let email: Email = "ravi@garage.in".parse().unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"ravi@garage.in\"");
    }
}
