//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;

use diag_wheels_core::format_inr;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Returns the content hash for main.css.
///
/// The hash is computed at build time from the CSS file content.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}

/// Formats a decimal amount as rupees with Indian digit grouping.
///
/// Usage in templates: `{{ product.price|inr }}`
#[askama::filter_fn]
pub fn inr(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(Decimal::from_str(raw.trim()).map_or_else(|_| format!("₹{raw}"), format_inr))
}

/// Formats a backend timestamp as `Oct 18, 2026`.
///
/// Usage in templates: `{{ order.created_at|date }}`
#[askama::filter_fn]
pub fn date(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(display_date(&value.to_string()))
}

/// Human date for an RFC 3339 timestamp or a plain `YYYY-MM-DD` date.
///
/// Anything unparseable is returned unchanged.
#[must_use]
pub fn display_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.format("%b %-d, %Y").to_string();
    }
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_or_else(|_| raw.to_string(), |d| d.format("%b %-d, %Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_date() {
        assert_eq!(display_date("2026-10-18T09:30:00Z"), "Oct 18, 2026");
        assert_eq!(display_date("2026-10-18T09:30:00.123+05:30"), "Oct 18, 2026");
        assert_eq!(display_date("2026-01-05"), "Jan 5, 2026");
        assert_eq!(display_date("2026-01-05 10:00:00"), "Jan 5, 2026");
        assert_eq!(display_date("yesterday"), "yesterday");
        assert_eq!(display_date(""), "");
    }
}
