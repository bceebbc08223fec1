//! # Domain Types
//!
//! Core domain types used throughout Cafe POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │◄──│  id (UUID)      │       │
//! │  │  name           │   │  items (snap)   │   │  name (ci key)  │       │
//! │  │  price / cost   │   │  total / tax    │   │  purchases      │       │
//! │  │  stock          │   │  customer_id    │   │  debt           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Cashbox      │   │ PaymentMethod   │   │    TaxRate      │       │
//! │  │  (singleton)    │   │  Cash           │   │  bps (u32)      │       │
//! │  │  is_open        │   │  Nequi          │   │  1900 = 19%     │       │
//! │  │  daily_sales    │   │  Credit         │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary fields are `*_cents` (i64 minor units). Every entity id is a
//! UUID v4 string assigned by the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so the 19% IVA is 1900 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product.
///
/// Mutated by admin edits (last writer wins) and by checkout, which only
/// ever touches `stock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown at the counter and on the receipt.
    pub name: String,

    pub description: Option<String>,

    /// Reference to the product picture (URL or static path).
    pub image_url: Option<String>,

    /// Free-form category label ("coffee", "pastries", ...).
    pub category: String,

    /// Sell price in cents, tax included.
    pub price_cents: i64,

    /// Unit cost in cents, used for profit.
    pub cost_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Inactive products stay in the catalog but cannot be sold.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Per-unit profit (price − cost).
    #[inline]
    pub fn unit_margin(&self) -> Money {
        self.price() - self.cost()
    }

    /// Active and with enough stock for `quantity`.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }

    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock <= threshold
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// Sales are written once by checkout and never change; there is no
/// cancellation or refund path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Completed,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash in the drawer.
    Cash,
    /// Nequi mobile wallet transfer.
    Nequi,
    /// On the customer's tab; adds to their debt.
    Credit,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Nequi,
        PaymentMethod::Credit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Nequi => "nequi",
            PaymentMethod::Credit => "credit",
        }
    }

    /// Money that physically lands in the drawer.
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(PaymentMethod::Cash),
            "nequi" => Ok(PaymentMethod::Nequi),
            "credit" | "credito" | "crédito" => Ok(PaymentMethod::Credit),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line of a completed sale.
///
/// Snapshot pattern: name, price and cost are frozen at sale time so later
/// catalog edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub product_id: String,
    /// Product name at time of sale.
    pub name: String,
    /// Unit price in cents at time of sale.
    pub unit_price_cents: i64,
    /// Unit cost in cents at time of sale.
    pub unit_cost_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity.
    pub subtotal_cents: i64,
}

impl SaleItem {
    /// Freezes a product into a sale line.
    pub fn snapshot(product: &Product, quantity: i64) -> Self {
        SaleItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            unit_cost_cents: product.cost_cents,
            quantity,
            subtotal_cents: product.price().multiply_quantity(quantity).cents(),
        }
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// (price − cost) × quantity.
    pub fn profit(&self) -> Money {
        Money::from_cents(self.unit_price_cents - self.unit_cost_cents)
            .multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale in the ledger.
///
/// `total` is tax-inclusive: `tax = round(total × 19%)` and
/// `subtotal = total − tax`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Loaded separately from `sale_items`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<SaleItem>,

    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub profit_cents: i64,
    pub payment_method: PaymentMethod,

    /// Name as typed at the counter.
    pub customer_name: String,

    /// Registry entry the sale was booked against. `None` only for legacy
    /// imports that predate the link.
    pub customer_id: Option<String>,

    pub status: SaleStatus,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }

    /// Units sold across all lines.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A named customer.
///
/// Created lazily by the first sale under a name (case-insensitive match),
/// or explicitly by an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Lifetime spend in cents.
    pub total_purchases_cents: i64,
    /// Outstanding credit in cents.
    pub total_debt_cents: i64,
    #[ts(as = "Option<String>")]
    pub last_purchase: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// New registry entry with zeroed totals.
    pub fn new(id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Customer {
            id: id.into(),
            name: name.into(),
            phone: None,
            email: None,
            total_purchases_cents: 0,
            total_debt_cents: 0,
            last_purchase: None,
            created_at: now,
        }
    }

    /// Registry lookup key: trimmed and lowercased.
    ///
    /// ```rust
    /// use cafe_core::Customer;
    ///
    /// assert_eq!(Customer::lookup_key("  José "), Customer::lookup_key("JOSÉ"));
    /// ```
    pub fn lookup_key(name: &str) -> String {
        name.trim().to_lowercase()
    }

    /// Case-insensitive name match, ignoring surrounding whitespace.
    pub fn matches_name(&self, name: &str) -> bool {
        Self::lookup_key(&self.name) == Self::lookup_key(name)
    }

    /// Books a completed sale against this customer.
    pub fn record_purchase(&mut self, total: Money, method: PaymentMethod, at: DateTime<Utc>) {
        self.total_purchases_cents += total.cents();
        if method == PaymentMethod::Credit {
            self.total_debt_cents += total.cents();
        }
        self.last_purchase = Some(at);
    }
}

// =============================================================================
// Cashbox
// =============================================================================

/// The register singleton.
///
/// State changes go through [`crate::cashbox`]; this struct is just the
/// persisted record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Cashbox {
    pub is_open: bool,
    /// Float placed in the drawer at opening.
    pub opening_amount_cents: i64,
    #[ts(as = "Option<String>")]
    pub opening_time: Option<DateTime<Utc>>,
    /// Sum of sale totals booked since opening.
    pub daily_sales_cents: i64,
    #[ts(as = "Option<String>")]
    pub closing_time: Option<DateTime<Utc>>,
    /// Cash counted at the last close.
    pub closing_amount_cents: Option<i64>,
}

// =============================================================================
// Unit Tests
// =============================================================================
