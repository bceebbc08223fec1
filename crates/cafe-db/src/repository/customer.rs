//! # Customer Repository
//!
//! The registry keys customers by a case-insensitive name (`name_key`,
//! computed with [`Customer::lookup_key`]). Checkout creates entries on the
//! fly; admins can also create, edit and delete them.

use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use cafe_core::Customer;

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// All customers sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, email, total_purchases_cents,
                   total_debt_cents, last_purchase, created_at
            FROM customers
            ORDER BY name_key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        fetch_customer(&self.pool, id).await
    }

    /// Case-insensitive lookup, ignoring surrounding whitespace.
    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<Customer>> {
        find_by_name(&self.pool, name).await
    }

    /// Fails with [`DbError::UniqueViolation`] when the name is taken.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_customer(&mut *conn, customer).await
    }

    /// Replaces every field except `created_at`.
    pub async fn update(&self, customer: &Customer) -> DbResult<Customer> {
        let mut conn = self.pool.acquire().await?;
        update_customer(&mut *conn, customer).await?;

        fetch_customer(&mut *conn, &customer.id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", &customer.id))
    }

    /// Removes the registry entry. Sales keep their name and id.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");

        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Shared Statements
// =============================================================================

pub(crate) async fn fetch_customer<'e, E>(executor: E, id: &str) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, phone, email, total_purchases_cents,
               total_debt_cents, last_purchase, created_at
        FROM customers
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(customer)
}

pub(crate) async fn find_by_name<'e, E>(executor: E, name: &str) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, phone, email, total_purchases_cents,
               total_debt_cents, last_purchase, created_at
        FROM customers
        WHERE name_key = ?1
        "#,
    )
    .bind(Customer::lookup_key(name))
    .fetch_optional(executor)
    .await?;

    Ok(customer)
}

pub(crate) async fn insert_customer(
    conn: &mut SqliteConnection,
    customer: &Customer,
) -> DbResult<()> {
    debug!(id = %customer.id, name = %customer.name, "Inserting customer");

    sqlx::query(
        r#"
        INSERT INTO customers (
            id, name, name_key, phone, email, total_purchases_cents,
            total_debt_cents, last_purchase, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&customer.id)
    .bind(customer.name.trim())
    .bind(Customer::lookup_key(&customer.name))
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(customer.total_purchases_cents)
    .bind(customer.total_debt_cents)
    .bind(customer.last_purchase)
    .bind(customer.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } if field.ends_with("name_key") => {
            DbError::duplicate("customer name", customer.name.trim())
        }
        other => other,
    })?;

    Ok(())
}

pub(crate) async fn update_customer(
    conn: &mut SqliteConnection,
    customer: &Customer,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE customers SET
            name = ?2, name_key = ?3, phone = ?4, email = ?5,
            total_purchases_cents = ?6, total_debt_cents = ?7, last_purchase = ?8
        WHERE id = ?1
        "#,
    )
    .bind(&customer.id)
    .bind(customer.name.trim())
    .bind(Customer::lookup_key(&customer.name))
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(customer.total_purchases_cents)
    .bind(customer.total_debt_cents)
    .bind(customer.last_purchase)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } if field.ends_with("name_key") => {
            DbError::duplicate("customer name", customer.name.trim())
        }
        other => other,
    })?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", &customer.id));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use chrono::Utc;

    #[tokio::test]
    async fn test_find_by_name_is_case_insensitive() {
        let db = test_db().await;
        let jose = Customer::new("c-1", "José", Utc::now());
        db.customers().insert(&jose).await.unwrap();

        let found = db.customers().find_by_name("  JOSÉ ").await.unwrap().unwrap();
        assert_eq!(found.id, "c-1");
        assert_eq!(found.name, "José");
        assert!(db.customers().find_by_name("Josefa").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = test_db().await;
        db.customers()
            .insert(&Customer::new("c-1", "Ana", Utc::now()))
            .await
            .unwrap();

        let err = db
            .customers()
            .insert(&Customer::new("c-2", "ana", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_db().await;
        let repo = db.customers();
        let mut pedro = Customer::new("c-1", "Pedro", Utc::now());
        repo.insert(&pedro).await.unwrap();

        pedro.phone = Some("300 123 4567".to_string());
        pedro.total_debt_cents = 1500;
        let updated = repo.update(&pedro).await.unwrap();
        assert_eq!(updated.phone.as_deref(), Some("300 123 4567"));
        assert_eq!(updated.total_debt_cents, 1500);

        repo.delete("c-1").await.unwrap();
        assert!(repo.get_by_id("c-1").await.unwrap().is_none());
        assert!(matches!(repo.delete("c-1").await, Err(DbError::NotFound { .. })));
        assert!(matches!(repo.update(&pedro).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_on_single_connection_pool() {
        let db = test_db().await;
        let repo = db.customers();
        let mut lucia = Customer::new("c-9", "Lucía", Utc::now());
        repo.insert(&lucia).await.unwrap();

        lucia.email = Some("lucia@cafe.co".to_string());
        let updated = tokio::time::timeout(std::time::Duration::from_secs(1), repo.update(&lucia))
            .await
            .expect("update must not wait on the pool")
            .unwrap();
        assert_eq!(updated.email.as_deref(), Some("lucia@cafe.co"));

        // Back-to-back updates each return their connection
        lucia.phone = Some("311 000 0000".to_string());
        repo.update(&lucia).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let db = test_db().await;
        let repo = db.customers();
        for (id, name) in [("1", "marta"), ("2", "Bruno"), ("3", "Ana")] {
            repo.insert(&Customer::new(id, name, Utc::now())).await.unwrap();
        }

        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Ana", "Bruno", "marta"]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }
}
