//! # Product Repository
//!
//! Catalog CRUD plus the two stock primitives checkout relies on.
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products SET stock = stock - :qty                               │
//! │  WHERE id = :id AND stock >= :qty                                       │
//! │                                                                         │
//! │  rows_affected = 1 → decremented                                        │
//! │  rows_affected = 0 → unknown id or not enough stock, nothing written    │
//! │                                                                         │
//! │  Two tills selling the last croissant: SQLite serialises the writes,    │
//! │  the second UPDATE sees stock = 0 and matches no row.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use cafe_core::Product;

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products sorted by name, optionally only the sellable ones.
    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Product>> {
        debug!(active_only, "Listing products");

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, image_url, category, price_cents,
                   cost_cents, stock, is_active, created_at, updated_at
            FROM products
            WHERE (?1 = 0 OR is_active = 1)
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, id).await
    }

    /// Inserts a new product. The id must already be assigned.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, image_url, category, price_cents,
                cost_cents, stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replaces every editable field of an existing product.
    ///
    /// `created_at` is preserved; `updated_at` is stamped now. Last writer
    /// wins.
    pub async fn update(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2, description = ?3, image_url = ?4, category = ?5,
                price_cents = ?6, cost_cents = ?7, stock = ?8, is_active = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        fetch_product(&self.pool, &product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))
    }

    /// Hard-deletes a product. Past sale lines keep their snapshot.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Current stock, `0` for an unknown product.
    pub async fn get_stock(&self, id: &str) -> DbResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(stock.unwrap_or(0))
    }

    /// Removes `quantity` units if the product is active and that many are on
    /// hand.
    ///
    /// Returns `false` without writing anything when the product is unknown,
    /// inactive, or `quantity` exceeds the stock.
    pub async fn decrement_stock(&self, id: &str, quantity: i64) -> DbResult<bool> {
        decrement_stock(&self.pool, id, quantity).await
    }

    /// Active products with `stock <= threshold`, lowest stock first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, image_url, category, price_cents,
                   cost_cents, stock, is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1 AND stock <= ?1
            ORDER BY stock, name COLLATE NOCASE
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        debug!(threshold, count = products.len(), "Low stock products");
        Ok(products)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Shared Statements
// =============================================================================

pub(crate) async fn fetch_product<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: SqliteExecutor<'e>,
{
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, description, image_url, category, price_cents,
               cost_cents, stock, is_active, created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(product)
}

pub(crate) async fn decrement_stock<'e, E>(executor: E, id: &str, quantity: i64) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    if quantity <= 0 {
        return Ok(false);
    }

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND is_active = 1 AND stock >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    let decremented = result.rows_affected() == 1;
    debug!(id = %id, quantity, decremented, "Stock decrement");
    Ok(decremented)
}

// =============================================================================
// Unit Tests
// =============================================================================
