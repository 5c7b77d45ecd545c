//! Status and kind enums mirrored from the backend API.
//!
//! All of these serialize as lowercase snake case strings. Unknown values
//! from the backend map to an `Other` variant where the backend is known to
//! grow new states, so a new status never breaks a page render.

use serde::{Deserialize, Serialize};

/// Kind of shop product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Shipped goods; stock-limited and charged shipping.
    #[default]
    Physical,
    /// Downloadable archive unlocked after payment or admin grant.
    Digital,
}

impl ProductType {
    /// Wire value of this product type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Digital => "digital",
        }
    }

    /// Human label for listings.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Physical => "Physical Product",
            Self::Digital => "Digital Product",
        }
    }
}

/// Archive format of a digital product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitalFileFormat {
    Zip,
    Rar,
}

impl DigitalFileFormat {
    /// Detect the format from a file name's extension.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(Self::Zip),
            "rar" => Some(Self::Rar),
            _ => None,
        }
    }

    /// Uppercase label ("ZIP", "RAR").
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Zip => "ZIP",
            Self::Rar => "RAR",
        }
    }
}

/// Order payment status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
    #[serde(untagged)]
    Other(String),
}

impl OrderStatus {
    /// Wire value of this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Other(s) => s,
        }
    }

    /// Whether an admin may still mark this order as paid.
    #[must_use]
    pub const fn can_mark_paid(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Product KYC verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl KycStatus {
    /// Wire value of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

/// Course access request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Wire value of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Wire value of this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// Account type chosen when accepting terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Student,
    BusinessOwner,
}

impl UserType {
    /// Wire value of this user type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::BusinessOwner => "business_owner",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_unknown_value() {
        let status: OrderStatus = serde_json::from_str("\"refunded\"").unwrap();
        assert_eq!(status, OrderStatus::Other("refunded".to_string()));
        assert_eq!(status.as_str(), "refunded");
        assert!(!status.can_mark_paid());

        let status: OrderStatus = serde_json::from_str("\"pending\"").unwrap();
        assert!(status.can_mark_paid());
    }

    #[test]
    fn test_user_type_wire_format() {
        let json = serde_json::to_string(&UserType::BusinessOwner).unwrap();
        assert_eq!(json, "\"business_owner\"");
    }

    #[test]
    fn test_digital_format_from_file_name() {
        assert_eq!(
            DigitalFileFormat::from_file_name("kit.ZIP"),
            Some(DigitalFileFormat::Zip)
        );
        assert_eq!(
            DigitalFileFormat::from_file_name("dump.tar.rar"),
            Some(DigitalFileFormat::Rar)
        );
        assert_eq!(DigitalFileFormat::from_file_name("readme"), None);
        assert_eq!(DigitalFileFormat::from_file_name("notes.pdf"), None);
    }
}
