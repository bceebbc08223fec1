//! # PIN Session Repository
//!
//! Sessions issued by a correct admin PIN. Expiry is absolute; expired rows
//! are purged whenever a token is looked up.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use cafe_core::PinSession;

#[derive(Debug, Clone)]
pub struct PinSessionRepository {
    pool: SqlitePool,
}

impl PinSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PinSessionRepository { pool }
    }

    pub async fn insert(&self, session: &PinSession) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pin_sessions (token, created_at, expires_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&session.token)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        debug!(expires_at = %session.expires_at, "Admin session stored");
        Ok(())
    }

    /// Returns the session if it exists and has not expired at `now`.
    ///
    /// Deletes every expired session first, so a stale token is gone after
    /// its first rejected use.
    pub async fn get_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<PinSession>> {
        self.purge_expired(now).await?;

        let session = sqlx::query_as::<_, PinSession>(
            r#"
            SELECT token, created_at, expires_at
            FROM pin_sessions
            WHERE token = ?1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session.filter(|s| s.is_valid_at(now)))
    }

    pub async fn is_valid(&self, token: &str, now: DateTime<Utc>) -> DbResult<bool> {
        Ok(self.get_valid(token, now).await?.is_some())
    }

    /// Removes a session. Returns `false` if the token was unknown.
    pub async fn revoke(&self, token: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM pin_sessions WHERE token = ?1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes sessions whose expiry is at or before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM pin_sessions WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        let purged = result.rows_affected();
        if purged > 0 {
            debug!(purged, "Expired admin sessions removed");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use chrono::Duration;

    #[tokio::test]
    async fn test_valid_within_ttl() {
        let db = test_db().await;
        let now = Utc::now();
        let session = PinSession::issue_default("tok-1", now);
        db.pin_sessions().insert(&session).await.unwrap();

        assert!(db.pin_sessions().is_valid("tok-1", now + Duration::hours(23)).await.unwrap());
        assert!(!db.pin_sessions().is_valid("other", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let db = test_db().await;
        let now = Utc::now();
        db.pin_sessions()
            .insert(&PinSession::issue_default("tok-1", now))
            .await
            .unwrap();

        let later = now + Duration::hours(24) + Duration::seconds(1);
        assert!(!db.pin_sessions().is_valid("tok-1", later).await.unwrap());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pin_sessions")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_revoke() {
        let db = test_db().await;
        let now = Utc::now();
        db.pin_sessions()
            .insert(&PinSession::issue_default("tok-1", now))
            .await
            .unwrap();

        assert!(db.pin_sessions().revoke("tok-1").await.unwrap());
        assert!(!db.pin_sessions().revoke("tok-1").await.unwrap());
        assert!(!db.pin_sessions().is_valid("tok-1", now).await.unwrap());
    }
}
