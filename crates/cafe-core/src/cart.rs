//! # Cart
//!
//! The counter's cart as it arrives at checkout, and the totals a finished
//! sale carries.
//!
//! ## Checkout Math
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart lines (product_id, qty)                                           │
//! │       │  merge duplicates, validate qty 1..=999, ≤ 100 lines            │
//! │       ▼                                                                 │
//! │  SaleItem snapshots (name, price, cost frozen)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  total    = Σ price × qty          (prices include tax)                 │
//! │  tax      = round(total × 19%)                                          │
//! │  subtotal = total − tax                                                 │
//! │  profit   = Σ (price − cost) × qty                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{SaleItem, TaxRate};
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// One requested product and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A validated cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product again sums
///   the quantities)
/// - Every quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Builds a cart from raw request lines, merging duplicates.
    ///
    /// Fails on the first invalid quantity, on a merged quantity above the
    /// per-line maximum, or when the cart has too many distinct lines. An
    /// empty input is rejected with [`CoreError::EmptyCart`].
    pub fn from_lines<I>(lines: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = CartLine>,
    {
        let mut cart = Cart::new();
        for line in lines {
            cart.add(line.product_id, line.quantity)?;
        }
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        Ok(cart)
    }

    /// Adds a product or increases its quantity if already present.
    pub fn add(&mut self, product_id: impl Into<String>, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;
        let product_id = product_id.into();

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            let merged = line.quantity + quantity;
            if merged > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.quantity = merged;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.lines.push(CartLine {
            product_id,
            quantity,
        });
        Ok(())
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Sale Totals
// =============================================================================

/// Monetary totals of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub profit_cents: i64,
}

impl SaleTotals {
    /// Computes totals for snapshotted lines.
    ///
    /// ```rust
    /// use cafe_core::cart::SaleTotals;
    /// use cafe_core::types::{SaleItem, TaxRate};
    ///
    /// let items = vec![
    ///     SaleItem { product_id: "a".into(), name: "A".into(), unit_price_cents: 2000,
    ///                unit_cost_cents: 800, quantity: 1, subtotal_cents: 2000 },
    ///     SaleItem { product_id: "b".into(), name: "B".into(), unit_price_cents: 1500,
    ///                unit_cost_cents: 600, quantity: 2, subtotal_cents: 3000 },
    /// ];
    /// let totals = SaleTotals::from_items(&items, TaxRate::from_bps(1900));
    /// assert_eq!(totals.total_cents, 5000);
    /// assert_eq!(totals.tax_cents, 950);
    /// assert_eq!(totals.subtotal_cents, 4050);
    /// assert_eq!(totals.profit_cents, 3000);
    /// ```
    pub fn from_items(items: &[SaleItem], rate: TaxRate) -> Self {
        let total: Money = items.iter().map(SaleItem::subtotal).sum();
        let profit: Money = items.iter().map(SaleItem::profit).sum();
        let tax = total.calculate_tax(rate);

        SaleTotals {
            subtotal_cents: (total - tax).cents(),
            tax_cents: tax.cents(),
            total_cents: total.cents(),
            profit_cents: profit.cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_lines_merge() {
        let cart = Cart::from_lines(vec![
            CartLine::new("a", 1),
            CartLine::new("b", 2),
            CartLine::new("a", 3),
        ])
        .unwrap();

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.lines()[0].quantity, 4);
        assert_eq!(cart.total_quantity(), 6);
    }

    #[test]
    fn test_empty_cart_rejected() {
        let result = Cart::from_lines(Vec::new());
        assert!(matches!(result, Err(CoreError::EmptyCart)));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let result = Cart::from_lines(vec![CartLine::new("a", 0)]);
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_merged_quantity_cap() {
        let result = Cart::from_lines(vec![CartLine::new("a", 600), CartLine::new("a", 600)]);
        assert!(matches!(
            result,
            Err(CoreError::QuantityTooLarge {
                requested: 1200,
                ..
            })
        ));
    }

    #[test]
    fn test_line_count_cap() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add(format!("p-{}", i), 1).unwrap();
        }
        assert!(matches!(
            cart.add("one-too-many", 1),
            Err(CoreError::CartTooLarge { .. })
        ));
        // Topping up an existing line is still fine
        assert!(cart.add("p-0", 1).is_ok());
    }

    #[test]
    fn test_totals_tax_is_share_of_total() {
        let items = vec![SaleItem {
            product_id: "a".to_string(),
            name: "Tinto".to_string(),
            unit_price_cents: 150,
            unit_cost_cents: 50,
            quantity: 1,
            subtotal_cents: 150,
        }];
        let totals = SaleTotals::from_items(&items, TaxRate::from_bps(1900));
        assert_eq!(totals.total_cents, 150);
        assert_eq!(totals.tax_cents, 29);
        assert_eq!(totals.subtotal_cents, 121);
        assert_eq!(totals.subtotal_cents + totals.tax_cents, totals.total_cents);
        assert_eq!(totals.profit_cents, 100);
    }
}
