//! # cafe-core: Pure Business Logic for Cafe POS
//!
//! Everything the coffee shop's back office decides without touching a disk
//! or a socket: what a cart costs, how much of it is tax, whether the
//! register may open, what the closing count should have been, and when the
//! admin PIN gate locks.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cafe POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Web frontend (counter + dashboard)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 cafe-api (axum handlers)                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cafe-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │  cart   │ │ cashbox │ │   pin   │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌───────────┐                        │   │
//! │  │   │  stats  │ │ receipt │ │ validation│                        │   │
//! │  │   └─────────┘ └─────────┘ └───────────┘                        │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • CLOCK IS A PARAMETER      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                cafe-db (SQLite repositories)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, Sale, Customer, Cashbox
//! - [`money`] - Money type with integer arithmetic
//! - [`cart`] - Cart lines, item snapshots and sale totals
//! - [`cashbox`] - Register open/close state machine and closing report
//! - [`pin`] - Admin PIN attempt tracking and session expiry
//! - [`stats`] - Revenue/profit summaries over the ledger
//! - [`receipt`] - Receipt layout for a completed sale
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use cafe_core::money::Money;
//! use cafe_core::types::TaxRate;
//!
//! // Prices are tax-inclusive; the tax share of a 5000 total at 19%
//! let total = Money::from_cents(5000);
//! let tax = total.calculate_tax(TaxRate::from_bps(1900));
//! assert_eq!(tax.cents(), 950);
//! assert_eq!((total - tax).cents(), 4050);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod cashbox;
pub mod error;
pub mod money;
pub mod pin;
pub mod receipt;
pub mod stats;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, SaleTotals};
pub use cashbox::ClosingReport;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pin::{PinAttempts, PinSession};
pub use receipt::Receipt;
pub use stats::{DailyStats, SalesSummary};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches a typed 1000 where 10 was meant.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest unit price, cost or register amount accepted, in cents.
///
/// A full cart at this price (`MAX_PRICE_CENTS × MAX_ITEM_QUANTITY ×
/// MAX_CART_ITEMS`) stays around 1e16, far inside `i64`, so line subtotals,
/// sale totals and running customer/register sums cannot overflow.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// VAT (IVA) in basis points. Prices are tax-inclusive, so this is the share
/// of the total that is tax, not a surcharge.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1900;

/// Products at or below this stock level show up on the low-stock list.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Consecutive wrong PINs before the gate locks.
pub const PIN_MAX_ATTEMPTS: u32 = 3;

/// Lifetime of an admin session once the PIN has been verified.
pub const PIN_SESSION_TTL_HOURS: i64 = 24;
