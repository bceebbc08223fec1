//! # Checkout
//!
//! Turns a cart into a completed sale inside one SQLite transaction.
//!
//! ## Transaction Outline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate cart + customer name          (nothing written on failure)    │
//! │       │                                                                 │
//! │  BEGIN                                                                  │
//! │       │                                                                 │
//! │  for each line:                                                         │
//! │       ├── UPDATE products SET stock = stock - qty                       │
//! │       │   WHERE id = ? AND is_active = 1 AND stock >= qty               │
//! │       │      └── 0 rows → classify: NotFound / Unavailable /            │
//! │       │                   InsufficientStock → ROLLBACK                  │
//! │       └── snapshot name / price / cost                                  │
//! │       │                                                                 │
//! │  totals (tax-inclusive, 19%)                                            │
//! │  customer: find by name or create, book purchase                        │
//! │  INSERT sale + items                                                    │
//! │  cashbox.daily_sales += total                                           │
//! │       │                                                                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first statement of the transaction is a write, so SQLite takes the
//! write lock up front and two tills checking out at once are serialised
//! instead of failing on a lock upgrade. Any early return drops the
//! transaction, which rolls everything back.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::{cashbox, customer, product, sale};
use cafe_core::validation::validate_customer_name;
use cafe_core::{
    Cart, CoreError, Customer, Money, PaymentMethod, Sale, SaleItem, SaleStatus, SaleTotals,
    TaxRate,
};

/// Transactional checkout service, handed out by [`crate::Database::checkout`].
#[derive(Debug, Clone)]
pub struct Checkout {
    pool: SqlitePool,
}

impl Checkout {
    pub fn new(pool: SqlitePool) -> Self {
        Checkout { pool }
    }

    /// Completes a sale at the current time.
    pub async fn complete_sale(
        &self,
        cart: &Cart,
        customer_name: &str,
        method: PaymentMethod,
        tax_rate: TaxRate,
    ) -> DbResult<Sale> {
        self.complete_sale_at(cart, customer_name, method, tax_rate, Utc::now())
            .await
    }

    /// Completes a sale stamped `now`.
    ///
    /// On error nothing has changed: stock, ledger, customer and cashbox are
    /// exactly as before the call.
    pub async fn complete_sale_at(
        &self,
        cart: &Cart,
        customer_name: &str,
        method: PaymentMethod,
        tax_rate: TaxRate,
        now: DateTime<Utc>,
    ) -> DbResult<Sale> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        let customer_name = validate_customer_name(customer_name).map_err(CoreError::from)?;

        debug!(
            lines = cart.len(),
            units = cart.total_quantity(),
            customer = %customer_name,
            method = %method,
            "Starting checkout"
        );

        let mut tx = self.pool.begin().await?;

        let mut items = Vec::with_capacity(cart.len());
        for line in cart.lines() {
            let item = take_line(&mut *tx, &line.product_id, line.quantity).await?;
            items.push(item);
        }

        let totals = SaleTotals::from_items(&items, tax_rate);
        let customer = book_customer(&mut *tx, &customer_name, &totals, method, now).await?;

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            items,
            subtotal_cents: totals.subtotal_cents,
            tax_cents: totals.tax_cents,
            total_cents: totals.total_cents,
            profit_cents: totals.profit_cents,
            payment_method: method,
            customer_name,
            customer_id: Some(customer.id),
            status: SaleStatus::Completed,
        };
        sale::insert_sale(&mut *tx, &sale).await?;

        let mut register = cashbox::fetch_cashbox(&mut *tx).await?;
        register.record_sale(sale.total());
        cashbox::write_cashbox(&mut *tx, &register).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            total = sale.total_cents,
            items = sale.item_count(),
            method = %method,
            "Sale completed"
        );
        Ok(sale)
    }
}

/// Reserves stock for one line and snapshots the product.
async fn take_line(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<SaleItem> {
    let taken = product::decrement_stock(&mut *conn, product_id, quantity).await?;
    let found = product::fetch_product(&mut *conn, product_id).await?;

    match found {
        Some(p) if taken => Ok(SaleItem::snapshot(&p, quantity)),
        None => Err(CoreError::ProductNotFound(product_id.to_string()).into()),
        Some(p) if !p.is_active => Err(CoreError::ProductUnavailable(p.name).into()),
        Some(p) => {
            warn!(
                product = %p.name,
                available = p.stock,
                requested = quantity,
                "Insufficient stock"
            );
            Err(CoreError::InsufficientStock {
                product: p.name,
                available: p.stock,
                requested: quantity,
            }
            .into())
        }
    }
}

/// Finds or creates the customer and books the purchase on them.
async fn book_customer(
    conn: &mut SqliteConnection,
    name: &str,
    totals: &SaleTotals,
    method: PaymentMethod,
    now: DateTime<Utc>,
) -> DbResult<Customer> {
    let existing = customer::find_by_name(&mut *conn, name).await?;
    let is_new = existing.is_none();

    let mut entry = match existing {
        Some(c) => c,
        None => Customer::new(Uuid::new_v4().to_string(), name, now),
    };
    entry.record_purchase(Money::from_cents(totals.total_cents), method, now);

    if is_new {
        customer::insert_customer(conn, &entry).await?;
        info!(customer_id = %entry.id, name = %entry.name, "Customer registered at checkout");
    } else {
        customer::update_customer(conn, &entry).await?;
    }

    Ok(entry)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{product, test_db};
    use crate::{Database, DbError};
    use cafe_core::CartLine;

    async fn stock(db: &Database, id: &str) -> i64 {
        db.products().get_stock(id).await.unwrap()
    }

    #[tokio::test]
    async fn test_two_line_sale() {
        let db = test_db().await;
        let a = product("Latte", 2000, 800, 10);
        let b = product("Croissant", 1500, 600, 10);
        db.products().insert(&a).await.unwrap();
        db.products().insert(&b).await.unwrap();

        let cart =
            Cart::from_lines(vec![CartLine::new(&a.id, 1), CartLine::new(&b.id, 2)]).unwrap();
        let sale = db
            .checkout()
            .complete_sale(&cart, "Juan", PaymentMethod::Cash, TaxRate::default())
            .await
            .unwrap();

        assert_eq!(sale.total_cents, 5000);
        assert_eq!(sale.tax_cents, 950);
        assert_eq!(sale.subtotal_cents, 4050);
        assert_eq!(sale.profit_cents, 3000);
        assert_eq!(sale.items.len(), 2);

        assert_eq!(stock(&db, &a.id).await, 9);
        assert_eq!(stock(&db, &b.id).await, 8);

        let juan = db.customers().find_by_name("juan").await.unwrap().unwrap();
        assert_eq!(sale.customer_id.as_deref(), Some(juan.id.as_str()));
        assert_eq!(juan.total_purchases_cents, 5000);
        assert_eq!(juan.total_debt_cents, 0);
        assert!(juan.last_purchase.is_some());

        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(db.cashbox().get().await.unwrap().daily_sales_cents, 5000);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let db = test_db().await;
        let a = product("Cheesecake", 4000, 1500, 1);
        db.products().insert(&a).await.unwrap();

        let cart = Cart::from_lines(vec![CartLine::new(&a.id, 2)]).unwrap();
        let err = db
            .checkout()
            .complete_sale(&cart, "Ana", PaymentMethod::Cash, TaxRate::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Rule(CoreError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            })
        ));
        assert_eq!(stock(&db, &a.id).await, 1);
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.customers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_second_line_failure_rolls_back_first() {
        let db = test_db().await;
        let a = product("Espresso", 1000, 300, 5);
        let b = product("Tart", 3000, 1000, 0);
        db.products().insert(&a).await.unwrap();
        db.products().insert(&b).await.unwrap();

        let cart =
            Cart::from_lines(vec![CartLine::new(&a.id, 2), CartLine::new(&b.id, 1)]).unwrap();
        let result = db
            .checkout()
            .complete_sale(&cart, "Ana", PaymentMethod::Nequi, TaxRate::default())
            .await;

        assert!(result.is_err());
        assert_eq!(stock(&db, &a.id).await, 5);
        assert_eq!(db.cashbox().get().await.unwrap().daily_sales_cents, 0);
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_products() {
        let db = test_db().await;
        let mut retired = product("Old blend", 1000, 300, 10);
        retired.is_active = false;
        db.products().insert(&retired).await.unwrap();

        let cart = Cart::from_lines(vec![CartLine::new("ghost", 1)]).unwrap();
        let err = db
            .checkout()
            .complete_sale(&cart, "Ana", PaymentMethod::Cash, TaxRate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::ProductNotFound(_))));

        let cart = Cart::from_lines(vec![CartLine::new(&retired.id, 1)]).unwrap();
        let err = db
            .checkout()
            .complete_sale(&cart, "Ana", PaymentMethod::Cash, TaxRate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::ProductUnavailable(_))));
        assert_eq!(stock(&db, &retired.id).await, 10);
    }

    #[tokio::test]
    async fn test_blank_customer_name_rejected() {
        let db = test_db().await;
        let a = product("Tea", 800, 100, 3);
        db.products().insert(&a).await.unwrap();

        let cart = Cart::from_lines(vec![CartLine::new(&a.id, 1)]).unwrap();
        let err = db
            .checkout()
            .complete_sale(&cart, "   ", PaymentMethod::Cash, TaxRate::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));
        assert_eq!(stock(&db, &a.id).await, 3);
    }

    #[tokio::test]
    async fn test_returning_customer_on_credit() {
        let db = test_db().await;
        let a = product("Sandwich", 6000, 2500, 10);
        db.products().insert(&a).await.unwrap();
        let cart = Cart::from_lines(vec![CartLine::new(&a.id, 1)]).unwrap();

        let first = db
            .checkout()
            .complete_sale(&cart, "Marta", PaymentMethod::Cash, TaxRate::default())
            .await
            .unwrap();
        let second = db
            .checkout()
            .complete_sale(&cart, "  MARTA ", PaymentMethod::Credit, TaxRate::default())
            .await
            .unwrap();

        assert_eq!(first.customer_id, second.customer_id);
        assert_eq!(db.customers().count().await.unwrap(), 1);

        let marta = db.customers().find_by_name("marta").await.unwrap().unwrap();
        assert_eq!(marta.name, "Marta");
        assert_eq!(marta.total_purchases_cents, 12_000);
        assert_eq!(marta.total_debt_cents, 6000);
        assert_eq!(db.cashbox().get().await.unwrap().daily_sales_cents, 12_000);
    }
}
