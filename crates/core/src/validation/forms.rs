//! Checkout, KYC, business upgrade and admin product forms.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::FieldErrors;
use super::upload::{UploadError, validate_digital_file};
use crate::types::{Email, ProductType};

/// Number of ID proof documents a product KYC submission needs.
pub const MIN_ID_PROOFS: usize = 2;

/// Single-message form failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("All fields are required")]
    AllFieldsRequired,
    #[error("{0} is required")]
    Required(&'static str),
    #[error("At least {MIN_ID_PROOFS} ID proof documents are required")]
    NotEnoughIdProofs,
    #[error("Digital file (ZIP/RAR) is required")]
    DigitalFileRequired,
    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Shipping details collected at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl CheckoutForm {
    /// Check every field, collecting one message per invalid field.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages when any field is blank or the email
    /// is malformed.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        errors.require("first_name", "First name", &self.first_name);
        errors.require("last_name", "Last name", &self.last_name);
        if errors.require("email", "Email", &self.email) && Email::parse(&self.email).is_err() {
            errors.insert("email", "Invalid email address");
        }
        errors.require("phone", "Phone number", &self.phone);
        errors.require("address", "Address", &self.address);
        errors.require("city", "City", &self.city);
        errors.require("state", "State", &self.state);
        errors.require("pincode", "Pincode", &self.pincode);

        errors.into_result()
    }

    /// Full name as sent to the backend.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// Product KYC text fields. Documents travel alongside as uploads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProductKycForm {
    pub full_name: String,
    pub address: String,
    pub contact_number: String,
    pub whatsapp_number: String,
}

impl ProductKycForm {
    /// Validate the form given how many ID proofs were just uploaded and how
    /// many the backend already holds for this user.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::AllFieldsRequired`] for any blank field and
    /// [`FormError::NotEnoughIdProofs`] when neither the new uploads nor the
    /// record on file reach [`MIN_ID_PROOFS`].
    pub fn validate(&self, new_id_proofs: usize, existing_id_proofs: usize) -> Result<(), FormError> {
        let blank = [
            &self.full_name,
            &self.address,
            &self.contact_number,
            &self.whatsapp_number,
        ]
        .iter()
        .any(|value| value.trim().is_empty());
        if blank {
            return Err(FormError::AllFieldsRequired);
        }

        if new_id_proofs < MIN_ID_PROOFS && existing_id_proofs < MIN_ID_PROOFS {
            return Err(FormError::NotEnoughIdProofs);
        }
        Ok(())
    }
}

/// Student → business owner upgrade request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusinessUpgradeForm {
    pub business_id: String,
    pub business_location_link: String,
}

impl BusinessUpgradeForm {
    /// # Errors
    ///
    /// Returns [`FormError::Required`] naming the first blank field.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.business_id.trim().is_empty() {
            return Err(FormError::Required("Business ID"));
        }
        if self.business_location_link.trim().is_empty() {
            return Err(FormError::Required("Business location link"));
        }
        Ok(())
    }
}

/// Admin product editor fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Category path, segments separated by `>` (`Tools > OBD > Wired`).
    pub category: String,
    pub product_type: ProductType,
    pub price: Decimal,
    pub stock_quantity: u32,
    pub is_active: bool,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            slug: String::new(),
            description: String::new(),
            category: String::new(),
            product_type: ProductType::Physical,
            price: Decimal::ZERO,
            stock_quantity: 0,
            is_active: true,
        }
    }
}

impl ProductForm {
    /// The slug to save: the one typed, or one derived from the name.
    #[must_use]
    pub fn resolved_slug(&self) -> String {
        let typed = self.slug.trim();
        if typed.is_empty() {
            generate_slug(&self.name)
        } else {
            typed.to_owned()
        }
    }

    /// Category path segments, root first.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.category
            .split('>')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Validate before create (`creating = true`) or update.
    ///
    /// `digital_file` is the name of an archive uploaded with this submit.
    ///
    /// # Errors
    ///
    /// Returns the first problem: missing name, missing slug, a new digital
    /// product without an archive, or an archive that is not ZIP/RAR.
    pub fn validate(&self, creating: bool, digital_file: Option<&str>) -> Result<(), FormError> {
        if self.name.trim().is_empty() {
            return Err(FormError::Required("Name"));
        }
        if self.resolved_slug().is_empty() {
            return Err(FormError::Required("Slug"));
        }

        match digital_file {
            Some(file_name) if self.product_type == ProductType::Digital => {
                validate_digital_file(file_name)?;
            }
            None if self.product_type == ProductType::Digital && creating => {
                return Err(FormError::DigitalFileRequired);
            }
            _ => {}
        }
        Ok(())
    }
}

/// URL slug from a display name: lowercase ASCII alphanumerics with runs of
/// anything else collapsed to a single `-`.
#[must_use]
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
