//! Quantity-tiered pricing and cart totals.
//!
//! Products may carry bulk pricing tiers: a quantity range and the per-item
//! price that applies inside it. A cart line is priced by scanning the tiers
//! in list order and taking the first one whose range contains the line
//! quantity; anything unmatched is charged at the regular unit price.
//!
//! ```
//! use diag_wheels_core::pricing::{PriceTier, price_line};
//! use rust_decimal::Decimal;
//!
//! let tiers = [
//!     PriceTier::new(1, Some(4), Decimal::from(100)),
//!     PriceTier::new(5, Some(9), Decimal::from(90)),
//!     PriceTier::new(10, None, Decimal::from(80)),
//! ];
//!
//! let line = price_line(Decimal::from(100), 5, &tiers);
//! assert_eq!(line.final_total, Decimal::from(450));
//! assert_eq!(line.savings, Decimal::from(50));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductType, format_inr};

/// Flat shipping charged when the cart holds at least one physical product.
pub const PHYSICAL_SHIPPING_FLAT: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// A bulk pricing bracket as delivered by the backend.
///
/// `min_qty` and `max_qty` may be missing or zero; see [`PriceTier::effective_min`]
/// and [`PriceTier::effective_max`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    #[serde(default)]
    pub min_qty: Option<u32>,
    #[serde(default)]
    pub max_qty: Option<u32>,
    pub price_per_item: Decimal,
}

impl PriceTier {
    /// Create a tier covering `min_qty..=max_qty` (`None` = no upper bound).
    #[must_use]
    pub const fn new(min_qty: u32, max_qty: Option<u32>, price_per_item: Decimal) -> Self {
        Self {
            min_qty: Some(min_qty),
            max_qty,
            price_per_item,
        }
    }

    /// Lower bound of the tier; missing or zero means 1.
    #[must_use]
    pub fn effective_min(&self) -> u32 {
        self.min_qty.filter(|&q| q > 0).unwrap_or(1)
    }

    /// Upper bound of the tier; missing or zero means unbounded.
    #[must_use]
    pub fn effective_max(&self) -> Option<u32> {
        self.max_qty.filter(|&q| q > 0)
    }

    /// Whether `quantity` falls inside this tier.
    #[must_use]
    pub fn contains(&self, quantity: u32) -> bool {
        quantity >= self.effective_min() && self.effective_max().is_none_or(|max| quantity <= max)
    }

    /// Range label for tier tables ("5-9", "10+").
    #[must_use]
    pub fn range_label(&self) -> String {
        match self.effective_max() {
            Some(max) if max == self.effective_min() => max.to_string(),
            Some(max) => format!("{}-{max}", self.effective_min()),
            None => format!("{}+", self.effective_min()),
        }
    }
}

/// First tier, in list order, whose range contains `quantity`.
#[must_use]
pub fn matching_tier(tiers: &[PriceTier], quantity: u32) -> Option<&PriceTier> {
    tiers.iter().find(|tier| tier.contains(quantity))
}

/// Price breakdown of a single cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePrice {
    pub quantity: u32,
    /// Regular per-item price.
    pub unit_price: Decimal,
    /// Per-item price actually charged.
    pub effective_unit_price: Decimal,
    /// `unit_price × quantity`.
    pub regular_total: Decimal,
    /// Amount charged for the line.
    pub final_total: Decimal,
    /// `regular_total − final_total`.
    pub savings: Decimal,
    pub applied_tier: Option<PriceTier>,
}

/// Price a line at `quantity` units of `unit_price`, applying bulk tiers.
#[must_use]
pub fn price_line(unit_price: Decimal, quantity: u32, tiers: &[PriceTier]) -> LinePrice {
    let qty = Decimal::from(quantity);
    let regular_total = unit_price * qty;

    let applied_tier = matching_tier(tiers, quantity).copied();
    let effective_unit_price = applied_tier.map_or(unit_price, |tier| tier.price_per_item);
    let final_total = effective_unit_price * qty;

    LinePrice {
        quantity,
        unit_price,
        effective_unit_price,
        regular_total,
        final_total,
        savings: regular_total - final_total,
        applied_tier,
    }
}

/// The next bracket a customer could reach by buying more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextTier {
    /// Units to add to reach the tier.
    pub items_needed: u32,
    /// Per-item price in that tier.
    pub price_per_item: Decimal,
    /// Difference from the per-item price paid now.
    pub savings_per_item: Decimal,
}

impl NextTier {
    /// Upsell line shown under a cart item.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Buy {} more to get {}/item (save {}/item!)",
            self.items_needed,
            format_inr(self.price_per_item),
            format_inr(self.savings_per_item),
        )
    }
}

/// Find the closest tier that starts above `quantity`.
///
/// Returns `None` when there are no tiers or the line already sits in the
/// highest one.
#[must_use]
pub fn next_tier(unit_price: Decimal, quantity: u32, tiers: &[PriceTier]) -> Option<NextTier> {
    let next = tiers
        .iter()
        .filter(|tier| tier.effective_min() > quantity)
        .min_by_key(|tier| tier.effective_min())?;

    let current = matching_tier(tiers, quantity).map_or(unit_price, |tier| tier.price_per_item);

    Some(NextTier {
        items_needed: next.effective_min() - quantity,
        price_per_item: next.price_per_item,
        savings_per_item: current - next.price_per_item,
    })
}

/// Pricing input for one cart line.
#[derive(Debug, Clone, Copy)]
pub struct LineInput<'a> {
    pub unit_price: Decimal,
    pub quantity: u32,
    pub tiers: &'a [PriceTier],
    pub product_type: ProductType,
}

/// Totals for a whole cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    /// Number of units across all lines.
    pub item_count: u32,
    /// Sum of tier-adjusted line totals.
    pub subtotal: Decimal,
    /// Sum of line savings.
    pub total_savings: Decimal,
    /// Flat shipping, charged once when any line is physical.
    pub shipping: Decimal,
    /// `subtotal + shipping`.
    pub total: Decimal,
}

/// Compute cart totals with bulk discounts and shipping.
#[must_use]
pub fn cart_totals<'a>(lines: impl IntoIterator<Item = LineInput<'a>>) -> CartTotals {
    let mut totals = CartTotals::default();
    let mut has_physical = false;

    for line in lines {
        let priced = price_line(line.unit_price, line.quantity, line.tiers);
        totals.item_count = totals.item_count.saturating_add(line.quantity);
        totals.subtotal += priced.final_total;
        totals.total_savings += priced.savings;
        has_physical |= line.product_type == ProductType::Physical;
    }

    if has_physical {
        totals.shipping = PHYSICAL_SHIPPING_FLAT;
    }
    totals.total = totals.subtotal + totals.shipping;
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn sample_tiers() -> Vec<PriceTier> {
        vec![
            PriceTier::new(1, Some(4), d(100)),
            PriceTier::new(5, Some(9), d(90)),
            PriceTier::new(10, None, d(80)),
        ]
    }

    #[test]
    fn test_quantity_five_uses_second_tier() {
        let line = price_line(d(100), 5, &sample_tiers());
        assert_eq!(line.effective_unit_price, d(90));
        assert_eq!(line.final_total, d(450));
        assert_eq!(line.regular_total, d(500));
        assert_eq!(line.savings, d(50));
        assert_eq!(line.applied_tier, Some(PriceTier::new(5, Some(9), d(90))));
    }

    #[test]
    fn test_quantity_twelve_uses_open_ended_tier() {
        let line = price_line(d(100), 12, &sample_tiers());
        assert_eq!(line.effective_unit_price, d(80));
        assert_eq!(line.final_total, d(960));
        assert_eq!(line.savings, d(240));
    }

    #[test]
    fn test_no_tiers_charges_regular_price() {
        let line = price_line(d(250), 3, &[]);
        assert_eq!(line.final_total, d(750));
        assert_eq!(line.savings, Decimal::ZERO);
        assert!(line.applied_tier.is_none());
    }

    #[test]
    fn test_gap_between_tiers_falls_back_to_regular() {
        let tiers = [
            PriceTier::new(5, Some(9), d(90)),
            PriceTier::new(20, None, d(70)),
        ];
        let line = price_line(d(100), 12, &tiers);
        assert_eq!(line.final_total, d(1200));
        assert!(line.applied_tier.is_none());
    }

    #[test]
    fn test_first_matching_tier_wins_on_overlap() {
        let tiers = [
            PriceTier::new(1, Some(10), d(95)),
            PriceTier::new(5, None, d(60)),
        ];
        let line = price_line(d(100), 7, &tiers);
        assert_eq!(line.effective_unit_price, d(95));
    }

    #[test]
    fn test_zero_and_missing_bounds_are_defaults() {
        let tier = PriceTier {
            min_qty: Some(0),
            max_qty: Some(0),
            price_per_item: d(10),
        };
        assert_eq!(tier.effective_min(), 1);
        assert_eq!(tier.effective_max(), None);
        assert!(tier.contains(1));
        assert!(tier.contains(10_000));
        assert!(!tier.contains(0));

        let tier: PriceTier = serde_json::from_str(r#"{"price_per_item": "12.5"}"#)
            .unwrap_or_else(|e| panic!("tier should parse: {e}"));
        assert_eq!(tier.effective_min(), 1);
        assert_eq!(tier.price_per_item, Decimal::new(125, 1));
    }

    #[test]
    fn test_range_labels() {
        let tiers = sample_tiers();
        let labels: Vec<String> = tiers.iter().map(PriceTier::range_label).collect();
        assert_eq!(labels, vec!["1-4", "5-9", "10+"]);
        assert_eq!(PriceTier::new(3, Some(3), d(1)).range_label(), "3");
    }

    #[test]
    fn test_next_tier_from_first_bracket() {
        let next = next_tier(d(100), 3, &sample_tiers());
        assert_eq!(
            next,
            Some(NextTier {
                items_needed: 2,
                price_per_item: d(90),
                savings_per_item: d(10),
            })
        );
        let message = next.map(|n| n.message()).unwrap_or_default();
        assert_eq!(message, "Buy 2 more to get ₹90/item (save ₹10/item!)");
    }

    #[test]
    fn test_next_tier_compares_against_current_tier_price() {
        let next = next_tier(d(100), 6, &sample_tiers());
        assert_eq!(next.map(|n| n.items_needed), Some(4));
        assert_eq!(next.map(|n| n.savings_per_item), Some(d(10)));
    }

    #[test]
    fn test_next_tier_none_at_top_or_without_tiers() {
        assert_eq!(next_tier(d(100), 10, &sample_tiers()), None);
        assert_eq!(next_tier(d(100), 1, &[]), None);
    }

    #[test]
    fn test_next_tier_picks_smallest_minimum_regardless_of_order() {
        let tiers = [
            PriceTier::new(20, None, d(70)),
            PriceTier::new(10, Some(19), d(85)),
        ];
        let next = next_tier(d(100), 2, &tiers);
        assert_eq!(next.map(|n| n.items_needed), Some(8));
        assert_eq!(next.map(|n| n.price_per_item), Some(d(85)));
        assert_eq!(next.map(|n| n.savings_per_item), Some(d(15)));
    }

    #[test]
    fn test_cart_totals_with_physical_item_adds_shipping() {
        let tiers = sample_tiers();
        let totals = cart_totals([
            LineInput {
                unit_price: d(100),
                quantity: 5,
                tiers: &tiers,
                product_type: ProductType::Physical,
            },
            LineInput {
                unit_price: d(300),
                quantity: 1,
                tiers: &[],
                product_type: ProductType::Digital,
            },
        ]);

        assert_eq!(totals.item_count, 6);
        assert_eq!(totals.subtotal, d(750));
        assert_eq!(totals.total_savings, d(50));
        assert_eq!(totals.shipping, d(200));
        assert_eq!(totals.total, d(950));
    }

    #[test]
    fn test_cart_totals_digital_only_ships_free() {
        let totals = cart_totals([LineInput {
            unit_price: d(300),
            quantity: 1,
            tiers: &[],
            product_type: ProductType::Digital,
        }]);
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, d(300));
    }

    #[test]
    fn test_empty_cart_totals() {
        assert_eq!(cart_totals([]), CartTotals::default());
    }
}
