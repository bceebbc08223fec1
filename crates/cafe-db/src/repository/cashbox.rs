//! # Cashbox Repository
//!
//! The register is a single row (`id = 1`, inserted by the initial
//! migration). Transitions are computed by [`cafe_core::Cashbox`] and written
//! back with a guard on the state they were computed from:
//!
//! ```text
//! read row ──► Cashbox::open / close ──► UPDATE ... WHERE is_open = <prev>
//!                                              │
//!                      rows_affected = 0 ◄─────┘  another admin got there
//!                      → AlreadyOpen / NotOpen      first
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::repository::sale;
use cafe_core::{Cashbox, ClosingReport, CoreError, Money};

#[derive(Debug, Clone)]
pub struct CashboxRepository {
    pool: SqlitePool,
}

impl CashboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashboxRepository { pool }
    }

    /// Current register record.
    pub async fn get(&self) -> DbResult<Cashbox> {
        fetch_cashbox(&self.pool).await
    }

    /// Overwrites the record (admin correction).
    pub async fn put(&self, cashbox: &Cashbox) -> DbResult<Cashbox> {
        let mut conn = self.pool.acquire().await?;
        write_cashbox(&mut *conn, cashbox).await?;
        info!(is_open = cashbox.is_open, "Cashbox record replaced");
        fetch_cashbox(&mut *conn).await
    }

    /// Opens the register with `amount` as float.
    pub async fn open(&self, amount: Money, now: DateTime<Utc>) -> DbResult<Cashbox> {
        let mut conn = self.pool.acquire().await?;
        let mut cashbox = fetch_cashbox(&mut *conn).await?;
        cashbox.open(amount, now)?;

        let applied = guarded_write(&mut *conn, &cashbox, false, None).await?;
        if !applied {
            return Err(CoreError::CashboxAlreadyOpen.into());
        }

        info!(opening_amount = %amount, "Cashbox opened");
        Ok(cashbox)
    }

    /// Closes the register against the counted cash and returns the
    /// reconciliation. The report is not persisted.
    ///
    /// The ledger read and the closing write share one transaction, so a
    /// sale committed meanwhile lands either in both the report and
    /// `daily_sales` or in neither.
    pub async fn close(&self, counted: Money, now: DateTime<Utc>) -> DbResult<ClosingReport> {
        let mut tx = self.pool.begin().await?;
        // Write first so SQLite takes the write lock before the reads.
        lock_register(&mut *tx).await?;

        let mut cashbox = fetch_cashbox(&mut *tx).await?;
        if !cashbox.is_open {
            return Err(CoreError::CashboxNotOpen.into());
        }

        let opened_at = cashbox.opening_time;
        let ledger = sale::sales_since(&mut *tx, opened_at.unwrap_or(now)).await?;
        let report = cashbox.close(counted, now, &ledger)?;

        let applied = guarded_write(&mut *tx, &cashbox, true, opened_at).await?;
        if !applied {
            return Err(CoreError::CashboxNotOpen.into());
        }
        tx.commit().await?;

        info!(
            expected = report.expected_amount_cents,
            counted = report.closing_amount_cents,
            difference = report.difference_cents,
            transactions = report.transaction_count,
            "Cashbox closed"
        );
        Ok(report)
    }
}

// =============================================================================
// Shared Statements
// =============================================================================

pub(crate) async fn fetch_cashbox<'e, E>(executor: E) -> DbResult<Cashbox>
where
    E: SqliteExecutor<'e>,
{
    let cashbox = sqlx::query_as::<_, Cashbox>(
        r#"
        SELECT is_open, opening_amount_cents, opening_time, daily_sales_cents,
               closing_time, closing_amount_cents
        FROM cashbox
        WHERE id = 1
        "#,
    )
    .fetch_optional(executor)
    .await?;

    Ok(cashbox.unwrap_or_default())
}

pub(crate) async fn write_cashbox<'e, E>(executor: E, cashbox: &Cashbox) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO cashbox (
            id, is_open, opening_amount_cents, opening_time, daily_sales_cents,
            closing_time, closing_amount_cents
        ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (id) DO UPDATE SET
            is_open = excluded.is_open,
            opening_amount_cents = excluded.opening_amount_cents,
            opening_time = excluded.opening_time,
            daily_sales_cents = excluded.daily_sales_cents,
            closing_time = excluded.closing_time,
            closing_amount_cents = excluded.closing_amount_cents
        "#,
    )
    .bind(cashbox.is_open)
    .bind(cashbox.opening_amount_cents)
    .bind(cashbox.opening_time)
    .bind(cashbox.daily_sales_cents)
    .bind(cashbox.closing_time)
    .bind(cashbox.closing_amount_cents)
    .execute(executor)
    .await?;

    Ok(())
}

async fn lock_register(conn: &mut SqliteConnection) -> DbResult<()> {
    sqlx::query("UPDATE cashbox SET is_open = is_open WHERE id = 1")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Writes `cashbox` only if the row is still in the state it was read in.
async fn guarded_write(
    conn: &mut SqliteConnection,
    cashbox: &Cashbox,
    was_open: bool,
    opened_at: Option<DateTime<Utc>>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE cashbox SET
            is_open = ?1, opening_amount_cents = ?2, opening_time = ?3,
            daily_sales_cents = ?4, closing_time = ?5, closing_amount_cents = ?6
        WHERE id = 1 AND is_open = ?7 AND (?7 = 0 OR opening_time IS ?8)
        "#,
    )
    .bind(cashbox.is_open)
    .bind(cashbox.opening_amount_cents)
    .bind(cashbox.opening_time)
    .bind(cashbox.daily_sales_cents)
    .bind(cashbox.closing_time)
    .bind(cashbox.closing_amount_cents)
    .bind(was_open)
    .bind(opened_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sale, test_db};
    use crate::DbError;
    use chrono::Duration;

    #[tokio::test]
    async fn test_initial_record_is_closed() {
        let db = test_db().await;
        let cashbox = db.cashbox().get().await.unwrap();
        assert!(!cashbox.is_open);
        assert_eq!(cashbox.daily_sales_cents, 0);
    }

    #[tokio::test]
    async fn test_open_twice_rejected() {
        let db = test_db().await;
        let now = Utc::now();
        let opened = db.cashbox().open(Money::from_cents(50_000), now).await.unwrap();
        assert!(opened.is_open);
        assert_eq!(db.cashbox().get().await.unwrap().opening_time, Some(now));

        let err = db.cashbox().open(Money::from_cents(1), now).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::CashboxAlreadyOpen)));
    }

    #[tokio::test]
    async fn test_close_when_closed_rejected() {
        let db = test_db().await;
        let err = db
            .cashbox()
            .close(Money::from_cents(1000), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::CashboxNotOpen)));
    }

    #[tokio::test]
    async fn test_close_reconciles_sales_since_opening() {
        let db = test_db().await;
        let opened_at = Utc::now();

        let before = sale("Ana", None, opened_at - Duration::hours(1), &[(7000, 1000, 1)]);
        let during = sale("Ana", None, opened_at + Duration::minutes(5), &[(10_000, 4000, 1)]);
        db.sales().insert(&before).await.unwrap();
        db.sales().insert(&during).await.unwrap();

        db.cashbox().open(Money::from_cents(50_000), opened_at).await.unwrap();
        let report = db
            .cashbox()
            .close(Money::from_cents(60_000), opened_at + Duration::hours(8))
            .await
            .unwrap();

        assert_eq!(report.revenue_cents, 10_000);
        assert_eq!(report.expected_amount_cents, 60_000);
        assert_eq!(report.difference_cents, 0);
        assert_eq!(report.transaction_count, 1);
        assert_eq!(report.items_sold, 1);

        let stored = db.cashbox().get().await.unwrap();
        assert!(!stored.is_open);
        assert_eq!(stored.closing_amount_cents, Some(60_000));
    }

    #[tokio::test]
    async fn test_rejected_close_rolls_back() {
        let db = test_db().await;
        let opened_at = Utc::now();
        db.cashbox().open(Money::from_cents(20_000), opened_at).await.unwrap();

        let err = db.cashbox().close(Money::zero(), opened_at).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));
        assert!(db.cashbox().get().await.unwrap().is_open);

        // The connection is back in the pool and the register still closes
        let during = sale("Ana", None, opened_at + Duration::minutes(1), &[(5_000, 2000, 1)]);
        db.sales().insert(&during).await.unwrap();
        let report = db
            .cashbox()
            .close(Money::from_cents(25_000), opened_at + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(report.revenue_cents, 5_000);
        assert!(report.is_balanced());
        assert!(!db.cashbox().get().await.unwrap().is_open);
    }

    #[tokio::test]
    async fn test_non_positive_amounts_rejected() {
        let db = test_db().await;
        let err = db.cashbox().open(Money::zero(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));
        assert!(!db.cashbox().get().await.unwrap().is_open);
    }

    #[tokio::test]
    async fn test_put_replaces_record() {
        let db = test_db().await;
        let record = Cashbox {
            is_open: true,
            opening_amount_cents: 20_000,
            opening_time: Some(Utc::now()),
            daily_sales_cents: 4_500,
            closing_time: None,
            closing_amount_cents: None,
        };
        let stored = db.cashbox().put(&record).await.unwrap();
        assert_eq!(stored, record);
    }
}
