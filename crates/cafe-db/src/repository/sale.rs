//! # Sale Repository
//!
//! The ledger: an append-only list of completed sales. Rows are only ever
//! written by checkout (or the legacy import) and never updated.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales                          sale_items                              │
//! │  ┌──────────────────────┐       ┌──────────────────────────────────┐    │
//! │  │ id                   │◄──────│ sale_id, line_no                 │    │
//! │  │ created_at           │  1:N  │ product_id, name (snapshot)      │    │
//! │  │ totals, method       │       │ unit_price, unit_cost, qty       │    │
//! │  │ customer_name / _id  │       │ subtotal                         │    │
//! │  └──────────────────────┘       └──────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Listing queries load headers first, then every line for those headers in
//! one `json_each` query, so a ledger page costs two round trips.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use cafe_core::{Customer, Sale, SaleItem};

#[derive(sqlx::FromRow)]
struct SaleItemRow {
    sale_id: String,
    #[sqlx(flatten)]
    item: SaleItem,
}

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Whole ledger, newest first.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, created_at, subtotal_cents, tax_cents, total_cents,
                   profit_cents, payment_method, customer_name, customer_id, status
            FROM sales
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = sales.len(), "Listed sales");
        self.with_items(sales).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, created_at, subtotal_cents, tax_cents, total_cents,
                   profit_cents, payment_method, customer_name, customer_id, status
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match sale {
            Some(sale) => Ok(self.with_items(vec![sale]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Sales with `start <= created_at < end`, oldest first.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, created_at, subtotal_cents, tax_cents, total_cents,
                   profit_cents, payment_method, customer_name, customer_id, status
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
            ORDER BY created_at
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        debug!(%start, %end, count = sales.len(), "Listed sales in range");
        self.with_items(sales).await
    }

    /// Sales created at or after `since`, oldest first.
    pub async fn list_since(&self, since: DateTime<Utc>) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, created_at, subtotal_cents, tax_cents, total_cents,
                   profit_cents, payment_method, customer_name, customer_id, status
            FROM sales
            WHERE created_at >= ?1
            ORDER BY created_at
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(sales).await
    }

    /// Sales booked against a customer, newest first.
    ///
    /// Matches on `customer_id`; rows imported without an id fall back to a
    /// case-insensitive comparison of the typed name.
    pub async fn list_for_customer(&self, customer: &Customer) -> DbResult<Vec<Sale>> {
        let candidates = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, created_at, subtotal_cents, tax_cents, total_cents,
                   profit_cents, payment_method, customer_name, customer_id, status
            FROM sales
            WHERE customer_id = ?1 OR customer_id IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(&customer.id)
        .fetch_all(&self.pool)
        .await?;

        // SQLite's lower() only folds ASCII, so the name fallback runs here
        let sales: Vec<Sale> = candidates
            .into_iter()
            .filter(|s| s.customer_id.is_some() || customer.matches_name(&s.customer_name))
            .collect();

        debug!(customer_id = %customer.id, count = sales.len(), "Customer history");
        self.with_items(sales).await
    }

    /// Appends a sale and its lines in one transaction.
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_sale(&mut *tx, sale).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Fills `items` on each sale.
    async fn with_items(&self, mut sales: Vec<Sale>) -> DbResult<Vec<Sale>> {
        if sales.is_empty() {
            return Ok(sales);
        }

        let ids: Vec<&str> = sales.iter().map(|s| s.id.as_str()).collect();
        let ids_json = serde_json::to_string(&ids)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        let rows = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT sale_id, product_id, name, unit_price_cents, unit_cost_cents,
                   quantity, subtotal_cents
            FROM sale_items
            WHERE sale_id IN (SELECT value FROM json_each(?1))
            ORDER BY sale_id, line_no
            "#,
        )
        .bind(ids_json)
        .fetch_all(&self.pool)
        .await?;

        attach_items(&mut sales, rows);
        Ok(sales)
    }
}

fn attach_items(sales: &mut [Sale], rows: Vec<SaleItemRow>) {
    let mut by_sale: HashMap<String, Vec<SaleItem>> = HashMap::new();
    for row in rows {
        by_sale.entry(row.sale_id).or_default().push(row.item);
    }
    for sale in sales {
        sale.items = by_sale.remove(&sale.id).unwrap_or_default();
    }
}

// =============================================================================
// Shared Statements
// =============================================================================

/// Writes the sale header and its lines on an open connection or
/// transaction.
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, created_at, subtotal_cents, tax_cents, total_cents,
            profit_cents, payment_method, customer_name, customer_id, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&sale.id)
    .bind(sale.created_at)
    .bind(sale.subtotal_cents)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(sale.profit_cents)
    .bind(sale.payment_method)
    .bind(&sale.customer_name)
    .bind(&sale.customer_id)
    .bind(sale.status)
    .execute(&mut *conn)
    .await?;

    for (line_no, item) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                sale_id, line_no, product_id, name, unit_price_cents,
                unit_cost_cents, quantity, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&sale.id)
        .bind(line_no as i64)
        .bind(&item.product_id)
        .bind(&item.name)
        .bind(item.unit_price_cents)
        .bind(item.unit_cost_cents)
        .bind(item.quantity)
        .bind(item.subtotal_cents)
        .execute(&mut *conn)
        .await?;
    }

    debug!(id = %sale.id, lines = sale.items.len(), "Sale written");
    Ok(())
}

/// Ledger rows at or after `since`, read on an open connection.
pub(crate) async fn sales_since(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
) -> DbResult<Vec<Sale>> {
    let mut sales = sqlx::query_as::<_, Sale>(
        r#"
        SELECT id, created_at, subtotal_cents, tax_cents, total_cents,
               profit_cents, payment_method, customer_name, customer_id, status
        FROM sales
        WHERE created_at >= ?1
        "#,
    )
    .bind(since)
    .fetch_all(&mut *conn)
    .await?;

    let rows = sqlx::query_as::<_, SaleItemRow>(
        r#"
        SELECT i.sale_id, i.product_id, i.name, i.unit_price_cents,
               i.unit_cost_cents, i.quantity, i.subtotal_cents
        FROM sale_items i
        JOIN sales s ON s.id = i.sale_id
        WHERE s.created_at >= ?1
        ORDER BY i.sale_id, i.line_no
        "#,
    )
    .bind(since)
    .fetch_all(&mut *conn)
    .await?;

    attach_items(&mut sales, rows);
    Ok(sales)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sale, test_db};
    use cafe_core::PaymentMethod;
    use chrono::Duration;

    #[tokio::test]
    async fn test_insert_and_get_with_items() {
        let db = test_db().await;
        let s = sale("Juan", Some("c-1"), Utc::now(), &[(2000, 800, 1), (1500, 600, 2)]);
        db.sales().insert(&s).await.unwrap();

        let loaded = db.sales().get_by_id(&s.id).await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[1].quantity, 2);
        assert_eq!(loaded.total_cents, 5000);
        assert_eq!(loaded.payment_method, PaymentMethod::Cash);
        assert!(db.sales().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = test_db().await;
        let now = Utc::now();
        let older = sale("Ana", None, now - Duration::hours(2), &[(1000, 400, 1)]);
        let newer = sale("Ana", None, now, &[(3000, 1000, 1)]);
        db.sales().insert(&older).await.unwrap();
        db.sales().insert(&newer).await.unwrap();

        let all = db.sales().list().await.unwrap();
        assert_eq!(all[0].id, newer.id);
        assert_eq!(all[1].id, older.id);
        assert!(all.iter().all(|s| s.items.len() == 1));
        assert_eq!(db.sales().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_range_queries() {
        let db = test_db().await;
        let now = Utc::now();
        let yesterday = sale("Ana", None, now - Duration::days(1), &[(1000, 400, 1)]);
        let today = sale("Ana", None, now, &[(2000, 400, 1)]);
        db.sales().insert(&yesterday).await.unwrap();
        db.sales().insert(&today).await.unwrap();

        let recent = db.sales().list_since(now - Duration::hours(1)).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, today.id);

        let window = db
            .sales()
            .list_between(now - Duration::days(2), now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, yesterday.id);
    }

    #[tokio::test]
    async fn test_customer_history_matches_id_and_legacy_name() {
        let db = test_db().await;
        let now = Utc::now();
        let juan = Customer::new("c-juan", "Juan", now);

        let linked = sale("Juan", Some("c-juan"), now, &[(1000, 400, 1)]);
        let legacy = sale("JUAN ", None, now - Duration::days(3), &[(500, 100, 1)]);
        let other = sale("Juana", None, now, &[(700, 100, 1)]);
        let renamed = sale("Someone", Some("c-other"), now, &[(900, 100, 1)]);
        for s in [&linked, &legacy, &other, &renamed] {
            db.sales().insert(s).await.unwrap();
        }

        let history = db.sales().list_for_customer(&juan).await.unwrap();
        let ids: Vec<_> = history.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![linked.id.as_str(), legacy.id.as_str()]);
    }
}
