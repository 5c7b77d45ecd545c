//! Session cart.
//!
//! The cart is a list of product snapshots kept in the session. Prices are
//! recomputed from the snapshot on every render with the core pricing
//! functions; the backend reprices the order when it is placed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use diag_wheels_core::{OrderId, ProductId};
use diag_wheels_core::ProductType;
use diag_wheels_core::pricing::{
    CartTotals, LineInput, LinePrice, NextTier, PriceTier, cart_totals, next_tier, price_line,
};

use crate::api::{OrderLineRequest, Product};

/// Why an item could not be added.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("{0} is out of stock")]
    OutOfStock(String),
    #[error("{0} is not available")]
    Unavailable(String),
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub image: String,
    pub product_type: ProductType,
    pub unit_price: Decimal,
    #[serde(default)]
    pub quantity_pricing: Vec<PriceTier>,
    pub quantity: u32,
}

impl CartItem {
    /// Snapshot a product at the requested quantity.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            slug: product.slug.clone(),
            name: product.name.clone(),
            image: product.image().to_string(),
            product_type: product.product_type,
            unit_price: product.price,
            quantity_pricing: product.quantity_pricing.clone(),
            quantity: Self::clamp(product.product_type, quantity),
        }
    }

    /// Digital items are always a single unit.
    fn clamp(product_type: ProductType, quantity: u32) -> u32 {
        match product_type {
            ProductType::Digital => 1,
            ProductType::Physical => quantity.max(1),
        }
    }

    #[must_use]
    pub fn is_digital(&self) -> bool {
        self.product_type == ProductType::Digital
    }

    #[must_use]
    pub fn price(&self) -> LinePrice {
        price_line(self.unit_price, self.quantity, &self.quantity_pricing)
    }

    #[must_use]
    pub fn next_tier(&self) -> Option<NextTier> {
        if self.is_digital() {
            return None;
        }
        next_tier(self.unit_price, self.quantity, &self.quantity_pricing)
    }

    fn pricing_input(&self) -> LineInput<'_> {
        LineInput {
            unit_price: self.unit_price,
            quantity: self.quantity,
            tiers: &self.quantity_pricing,
            product_type: self.product_type,
        }
    }
}

/// The shopper's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Units across all lines (badge count).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }

    #[must_use]
    pub fn has_physical(&self) -> bool {
        self.items.iter().any(|item| !item.is_digital())
    }

    /// Add a product. Physical quantities accumulate; digital items stay at 1.
    ///
    /// # Errors
    ///
    /// Returns an error for inactive products and physical products that are
    /// out of stock.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if !product.is_listed() {
            return Err(CartError::Unavailable(product.name.clone()));
        }
        if product.product_type == ProductType::Physical && !product.is_in_stock() {
            return Err(CartError::OutOfStock(product.name.clone()));
        }

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.id)
        {
            let fresh = CartItem::from_product(product, quantity);
            let added = fresh.quantity;
            *existing = CartItem {
                quantity: if fresh.is_digital() {
                    1
                } else {
                    existing.quantity.saturating_add(added)
                },
                ..fresh
            };
        } else {
            self.items.push(CartItem::from_product(product, quantity));
        }
        Ok(())
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// Returns `false` when the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id);
        }
        match self
            .items
            .iter_mut()
            .find(|item| &item.product_id == product_id)
        {
            Some(item) => {
                item.quantity = CartItem::clamp(item.product_type, quantity);
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns whether anything was removed.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.product_id != product_id);
        self.items.len() != before
    }

    #[must_use]
    pub fn totals(&self) -> CartTotals {
        cart_totals(self.items.iter().map(CartItem::pricing_input))
    }

    /// Order lines for the backend.
    #[must_use]
    pub fn order_lines(&self) -> Vec<OrderLineRequest> {
        self.items
            .iter()
            .map(|item| OrderLineRequest {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            })
            .collect()
    }
}

/// A backend order placed from the cart whose payment has not completed.
///
/// Remembers the lines it was placed with; a changed cart needs a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: OrderId,
    lines: Vec<(ProductId, u32)>,
}

impl PendingOrder {
    #[must_use]
    pub fn new(id: OrderId, cart: &Cart) -> Self {
        Self {
            id,
            lines: Self::lines_of(cart),
        }
    }

    /// Whether the cart still holds exactly what this order was placed with.
    #[must_use]
    pub fn matches(&self, cart: &Cart) -> bool {
        self.lines == Self::lines_of(cart)
    }

    fn lines_of(cart: &Cart) -> Vec<(ProductId, u32)> {
        cart.items
            .iter()
            .map(|item| (item.product_id.clone(), item.quantity))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(id: &str, kind: &str, stock: i64) -> Product {
        serde_json::from_value(json!({
            "id": id,
            "name": format!("Product {id}"),
            "slug": id,
            "price": "100",
            "type": kind,
            "stock_quantity": stock,
            "quantity_pricing": [
                {"min_qty": 1, "max_qty": 4, "price_per_item": "100"},
                {"min_qty": 5, "max_qty": 9, "price_per_item": "90"},
                {"min_qty": 10, "max_qty": null, "price_per_item": "80"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_physical_quantities_accumulate() {
        let mut cart = Cart::default();
        cart.add(&product("p1", "physical", 10), 2).unwrap();
        cart.add(&product("p1", "physical", 10), 3).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.items[0].price().final_total, Decimal::from(450));
    }

    #[test]
    fn test_digital_items_stay_single() {
        let mut cart = Cart::default();
        cart.add(&product("d1", "digital", 0), 4).unwrap();
        cart.add(&product("d1", "digital", 0), 1).unwrap();
        assert_eq!(cart.items[0].quantity, 1);
        assert!(cart.set_quantity(&ProductId::new("d1"), 7));
        assert_eq!(cart.items[0].quantity, 1);
        assert!(cart.items[0].next_tier().is_none());
    }

    #[test]
    fn test_out_of_stock_physical_rejected() {
        let mut cart = Cart::default();
        let err = cart.add(&product("p2", "physical", 0), 1).unwrap_err();
        assert!(matches!(err, CartError::OutOfStock(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::default();
        cart.add(&product("p1", "physical", 10), 2).unwrap();
        assert!(cart.set_quantity(&ProductId::new("p1"), 0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity(&ProductId::new("missing"), 3));
    }

    #[test]
    fn test_totals_with_shipping() {
        let mut cart = Cart::default();
        cart.add(&product("p1", "physical", 20), 12).unwrap();
        cart.add(&product("d1", "digital", 0), 1).unwrap();
        let totals = cart.totals();
        assert_eq!(totals.item_count, 13);
        assert_eq!(totals.subtotal, Decimal::from(1060));
        assert_eq!(totals.total_savings, Decimal::from(240));
        assert_eq!(totals.shipping, Decimal::from(200));
        assert_eq!(totals.total, Decimal::from(1260));
        assert_eq!(cart.item_count(), 13);
    }

    #[test]
    fn test_digital_only_has_no_shipping() {
        let mut cart = Cart::default();
        cart.add(&product("d1", "digital", 0), 1).unwrap();
        assert_eq!(cart.totals().shipping, Decimal::ZERO);
        assert!(!cart.has_physical());
    }

    #[test]
    fn test_order_lines() {
        let mut cart = Cart::default();
        cart.add(&product("p1", "physical", 20), 3).unwrap();
        let lines = cart.order_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
    }

    #[test]
    fn test_pending_order_follows_cart_contents() {
        let mut cart = Cart::default();
        cart.add(&product("p1", "physical", 10), 2).unwrap();
        let pending = PendingOrder::new(OrderId::new("order-1"), &cart);
        assert!(pending.matches(&cart));

        cart.add(&product("p1", "physical", 10), 1).unwrap();
        assert!(!pending.matches(&cart));

        assert!(cart.set_quantity(&ProductId::new("p1"), 2));
        assert!(pending.matches(&cart));

        cart.add(&product("d1", "digital", 0), 1).unwrap();
        assert!(!pending.matches(&cart));
    }
}
