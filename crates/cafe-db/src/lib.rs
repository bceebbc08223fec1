//! # cafe-db: Database Layer for Cafe POS
//!
//! SQLite storage for the shop: catalog, sales ledger, customer registry,
//! register state and admin sessions, accessed through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cafe POS Data Flow                               │
//! │                                                                         │
//! │  axum handler (POST /sales)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     cafe-db (THIS CRATE)                        │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │ Repositories  │    │  Migrations  │    │    │
//! │  │   │   (pool.rs)   │    │ products      │    │  (embedded)  │    │    │
//! │  │   │               │◄───│ sales         │    │              │    │    │
//! │  │   │  SqlitePool   │    │ customers     │    │ 001_initial  │    │    │
//! │  │   │               │    │ cashbox       │    │              │    │    │
//! │  │   │               │    │ pin_sessions  │    │              │    │    │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘    │    │
//! │  │           │                                                     │    │
//! │  │           └──► Checkout (one transaction per sale)              │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use cafe_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./cafe.db")).await?;
//! let low = db.products().low_stock(5).await?;
//! let sale = db.checkout().complete_sale(&cart, "Juan", PaymentMethod::Cash, rate).await?;
//! ```

pub mod checkout;
pub mod error;
pub mod import;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use checkout::Checkout;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    CashboxRepository, CustomerRepository, PinSessionRepository, ProductRepository,
    SaleRepository,
};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use crate::{Database, DbConfig};
    use cafe_core::{
        PaymentMethod, Product, Sale, SaleItem, SaleStatus, SaleTotals, TaxRate,
    };

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn product(name: &str, price_cents: i64, cost_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
            image_url: None,
            category: "general".to_string(),
            price_cents,
            cost_cents,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// A cash sale with one line per `(price, cost, quantity)`.
    pub fn sale(
        customer_name: &str,
        customer_id: Option<&str>,
        at: DateTime<Utc>,
        lines: &[(i64, i64, i64)],
    ) -> Sale {
        let items: Vec<SaleItem> = lines
            .iter()
            .enumerate()
            .map(|(i, &(price, cost, qty))| SaleItem {
                product_id: format!("p-{}", i),
                name: format!("Item {}", i),
                unit_price_cents: price,
                unit_cost_cents: cost,
                quantity: qty,
                subtotal_cents: price * qty,
            })
            .collect();
        let totals = SaleTotals::from_items(&items, TaxRate::default());

        Sale {
            id: Uuid::new_v4().to_string(),
            created_at: at,
            items,
            subtotal_cents: totals.subtotal_cents,
            tax_cents: totals.tax_cents,
            total_cents: totals.total_cents,
            profit_cents: totals.profit_cents,
            payment_method: PaymentMethod::Cash,
            customer_name: customer_name.to_string(),
            customer_id: customer_id.map(str::to_string),
            status: SaleStatus::Completed,
        }
    }
}
