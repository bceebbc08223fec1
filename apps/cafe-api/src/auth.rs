//! # Admin PIN Gate
//!
//! Admin screens (dashboard, customers, register) sit behind a shared PIN.
//!
//! ```text
//! POST /auth/pin { pin }
//!      │
//!      ▼
//! PinAttempts::check ── locked? ──► 429 + Retry-After
//!      │
//!      ▼
//! argon2 verify (blocking pool)
//!      │
//!      ├── wrong ──► record_failure ──► 401 (n attempts left) / 429
//!      │
//!      ▼
//! PinSession stored in pin_sessions, token returned
//!      │
//!      ▼
//! later requests: X-Admin-Session: <token> ──► AdminSession extractor
//! ```
//!
//! The attempt counter lives in process memory and is shared by every
//! client; it resets on restart.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use cafe_core::{PinAttempts, PinSession};
use cafe_db::Database;

use crate::config::{AuthConfig, ConfigError};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Header carrying the session token on admin requests.
pub const SESSION_HEADER: &str = "x-admin-session";

// =============================================================================
// Hashing
// =============================================================================

/// Hashes a PIN into an argon2 PHC string.
pub fn hash_pin(pin: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(pin.as_bytes(), &salt)?
        .to_string())
}

/// Checks a PIN against a PHC string. A malformed hash never matches.
pub fn verify_pin(pin: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(pin.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// =============================================================================
// Gate
// =============================================================================

pub struct PinGate {
    hash: String,
    attempts: Mutex<PinAttempts>,
    session_ttl: Duration,
}

impl PinGate {
    pub fn new(hash: String, attempts: PinAttempts, session_ttl: Duration) -> Self {
        PinGate {
            hash,
            attempts: Mutex::new(attempts),
            session_ttl,
        }
    }

    /// Builds the gate from config, hashing a plain PIN if no hash is given.
    pub fn from_config(auth: &AuthConfig) -> Result<Self, ConfigError> {
        let hash = match (auth.admin_pin_hash.as_deref(), auth.admin_pin.as_deref()) {
            (Some(hash), _) if !hash.trim().is_empty() => {
                PasswordHash::new(hash.trim()).map_err(|e| {
                    ConfigError::InvalidValue(format!("admin_pin_hash: {}", e))
                })?;
                hash.trim().to_string()
            }
            (_, Some(pin)) => hash_pin(pin)
                .map_err(|e| ConfigError::InvalidValue(format!("admin_pin: {}", e)))?,
            _ => {
                return Err(ConfigError::MissingRequired(
                    "auth.admin_pin or auth.admin_pin_hash".to_string(),
                ))
            }
        };

        Ok(PinGate::new(
            hash,
            PinAttempts::new(auth.max_attempts, Duration::seconds(auth.lockout_secs)),
            Duration::hours(auth.session_ttl_hours),
        ))
    }

    /// Verifies `pin` and opens a session on success.
    ///
    /// Attempts are serialized; a guess cannot slip past the counter by
    /// racing another one.
    pub async fn unlock(
        &self,
        db: &Database,
        pin: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<PinSession> {
        let mut attempts = self.attempts.lock().await;
        attempts.check(now)?;

        let hash = self.hash.clone();
        let candidate = pin.to_string();
        let matched = tokio::task::spawn_blocking(move || verify_pin(&candidate, &hash))
            .await
            .map_err(|e| {
                error!("PIN verification task failed: {}", e);
                ApiError::internal("PIN verification failed")
            })?;

        if !matched {
            let err = attempts.record_failure(now);
            warn!(failures = attempts.failures(), "Rejected admin PIN");
            return Err(err.into());
        }
        attempts.record_success();
        drop(attempts);

        let session = PinSession::issue(Uuid::new_v4().to_string(), now, self.session_ttl);
        db.pin_sessions().insert(&session).await?;
        info!(expires_at = %session.expires_at, "Admin session opened");
        Ok(session)
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// A valid admin session taken from the `X-Admin-Session` header.
///
/// Handlers that take this argument are admin-only; the request is rejected
/// with 401 before the handler runs.
#[derive(Debug, Clone)]
pub struct AdminSession(pub PinSession);

/// Token from the session header, if present and readable.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Admin PIN required"))?;

        match state.db.pin_sessions().get_valid(&token, Utc::now()).await? {
            Some(session) => Ok(AdminSession(session)),
            None => Err(ApiError::unauthorized("Admin session expired, enter the PIN again")),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_core::CoreError;
    use cafe_db::DbConfig;

    fn gate(pin: &str) -> PinGate {
        PinGate::new(
            hash_pin(pin).unwrap(),
            PinAttempts::new(3, Duration::seconds(60)),
            Duration::hours(24),
        )
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_pin("2026@cafe").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_pin("2026@cafe", &hash));
        assert!(!verify_pin("2026@caf", &hash));
        assert!(!verify_pin("2026@cafe", "not-a-hash"));
    }

    #[test]
    fn test_from_config_prefers_hash() {
        let hash = hash_pin("1111").unwrap();
        let auth = AuthConfig {
            admin_pin: Some("2222".to_string()),
            admin_pin_hash: Some(hash.clone()),
            ..AuthConfig::default()
        };
        let gate = PinGate::from_config(&auth).unwrap();
        assert_eq!(gate.hash, hash);
    }

    #[test]
    fn test_from_config_rejects_bad_hash() {
        let auth = AuthConfig {
            admin_pin_hash: Some("plain-text".to_string()),
            ..AuthConfig::default()
        };
        assert!(matches!(
            PinGate::from_config(&auth),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn test_unlock_issues_session() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let gate = gate("2468");
        let now = Utc::now();

        let session = gate.unlock(&db, "2468", now).await.unwrap();
        assert_eq!(session.expires_at, now + Duration::hours(24));
        assert!(db.pin_sessions().is_valid(&session.token, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_third_failure_locks_gate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let gate = gate("2468");
        let now = Utc::now();

        for remaining in [2, 1] {
            let err = gate.unlock(&db, "0000", now).await.unwrap_err();
            assert_eq!(
                err.message,
                CoreError::InvalidPin {
                    remaining_attempts: remaining
                }
                .to_string()
            );
        }
        let err = gate.unlock(&db, "0000", now).await.unwrap_err();
        assert_eq!(err.retry_after_secs, Some(60));

        // Even the right PIN is refused during the lockout
        let err = gate.unlock(&db, "2468", now).await.unwrap_err();
        assert!(err.retry_after_secs.is_some());

        let later = now + Duration::seconds(61);
        assert!(gate.unlock(&db, "2468", later).await.is_ok());
    }
}
