//! Type-safe price representation using decimal arithmetic.
//!
//! The storefront sells in Indian rupees; amounts are displayed with the
//! Indian digit grouping (`₹1,23,456.5`).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a rupee price.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Amount in the smallest currency unit (paise for INR), as payment
    /// gateways expect it.
    #[must_use]
    pub fn minor_units(&self) -> i64 {
        let minor = (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        i64::try_from(minor).unwrap_or(0)
    }

    /// Format for display (e.g., "₹1,23,456.5").
    #[must_use]
    pub fn display(&self) -> String {
        match self.currency_code {
            CurrencyCode::INR => format_inr(self.amount),
            CurrencyCode::USD => format!("${:.2}", self.amount),
        }
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

/// Format a rupee amount with Indian digit grouping.
///
/// At most two fraction digits are shown and trailing zeros are dropped,
/// so `450.00` renders as `₹450` and `123456.50` as `₹1,23,456.5`.
#[must_use]
pub fn format_inr(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = rounded.abs().to_string();

    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + 6);
    if negative {
        out.push('-');
    }
    out.push('₹');
    out.push_str(&group_indian(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Group an integer digit string as lakh/crore: last three digits, then pairs.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (h, t) = rest.split_at(rest.len() - 2);
        groups.push(t);
        rest = h;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();

    format!("{},{tail}", groups.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_small_amounts() {
        assert_eq!(format_inr(Decimal::ZERO), "₹0");
        assert_eq!(format_inr(Decimal::from(90)), "₹90");
        assert_eq!(format_inr(Decimal::new(45000, 2)), "₹450");
    }

    #[test]
    fn test_format_indian_grouping() {
        assert_eq!(format_inr(Decimal::from(1000)), "₹1,000");
        assert_eq!(format_inr(Decimal::from(123_456)), "₹1,23,456");
        assert_eq!(format_inr(Decimal::from(12_345_678)), "₹1,23,45,678");
    }

    #[test]
    fn test_format_fraction_digits() {
        assert_eq!(format_inr(Decimal::new(12_345_650, 2)), "₹1,23,456.5");
        assert_eq!(format_inr(Decimal::new(4999, 2)), "₹49.99");
        assert_eq!(format_inr(Decimal::new(10_005, 3)), "₹10.01");
    }

    #[test]
    fn test_format_negative() {
        assert_eq!(format_inr(Decimal::from(-1500)), "-₹1,500");
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(Price::inr(Decimal::new(4999, 2)).minor_units(), 4999);
        assert_eq!(Price::inr(Decimal::from(650)).minor_units(), 65_000);
    }

    #[test]
    fn test_display_by_currency() {
        assert_eq!(Price::inr(Decimal::from(2500)).display(), "₹2,500");
        assert_eq!(
            Price::new(Decimal::new(1999, 2), CurrencyCode::USD).display(),
            "$19.99"
        );
    }
}
