//! # Admin PIN Gate
//!
//! Bookkeeping for the shared admin PIN: consecutive failures, the lockout
//! that follows, and the lifetime of the session a correct PIN unlocks.
//! Hash verification lives in the API crate; this module only decides
//! whether an attempt may be made and what a failure costs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  verify(pin)                                                            │
//! │     │                                                                   │
//! │     ├── locked? ─────────────► PinLocked { retry_after_secs }           │
//! │     │                                                                   │
//! │     ├── wrong ──► failures += 1                                         │
//! │     │               ├── failures < 3 → InvalidPin { remaining }         │
//! │     │               └── failures = 3 → lock for cooldown, reset count   │
//! │     │                                                                   │
//! │     └── right ──► failures = 0, PinSession { expires_at = now + 24h }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::{PIN_MAX_ATTEMPTS, PIN_SESSION_TTL_HOURS};

// =============================================================================
// Attempt Tracking
// =============================================================================

/// Consecutive-failure counter with a timed lockout.
#[derive(Debug, Clone)]
pub struct PinAttempts {
    max_attempts: u32,
    lockout: Duration,
    failures: u32,
    locked_until: Option<DateTime<Utc>>,
}

impl PinAttempts {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        PinAttempts {
            max_attempts: max_attempts.max(1),
            lockout,
            failures: 0,
            locked_until: None,
        }
    }

    /// Fails with [`CoreError::PinLocked`] while a lockout is running.
    pub fn check(&self, now: DateTime<Utc>) -> CoreResult<()> {
        match self.locked_until {
            Some(until) if until > now => {
                // Round up so a client never retries a second early
                let millis = (until - now).num_milliseconds();
                Err(CoreError::PinLocked {
                    retry_after_secs: (millis + 999) / 1000,
                })
            }
            _ => Ok(()),
        }
    }

    /// Records a wrong PIN and returns the error to surface.
    ///
    /// The attempt that reaches `max_attempts` starts the lockout and resets
    /// the counter, so the next window starts fresh.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> CoreError {
        self.failures += 1;
        if self.failures >= self.max_attempts {
            self.failures = 0;
            self.locked_until = Some(now + self.lockout);
            return CoreError::PinLocked {
                retry_after_secs: self.lockout.num_seconds(),
            };
        }
        CoreError::InvalidPin {
            remaining_attempts: self.max_attempts - self.failures,
        }
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.locked_until = None;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

impl Default for PinAttempts {
    fn default() -> Self {
        PinAttempts::new(PIN_MAX_ATTEMPTS, Duration::seconds(60))
    }
}

// =============================================================================
// Session
// =============================================================================

/// An unlocked admin session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PinSession {
    /// Opaque bearer token sent back in `X-Admin-Session`.
    pub token: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Absolute expiry; sessions are not extended by use.
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
}

impl PinSession {
    pub fn issue(token: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        PinSession {
            token: token.into(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Issues a session with the standard 24 hour lifetime.
    pub fn issue_default(token: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::issue(token, now, Duration::hours(PIN_SESSION_TTL_HOURS))
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Seconds left, zero once expired.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_third_failure_locks() {
        let now = Utc::now();
        let mut attempts = PinAttempts::new(3, Duration::seconds(60));

        assert!(matches!(
            attempts.record_failure(now),
            CoreError::InvalidPin {
                remaining_attempts: 2
            }
        ));
        assert!(matches!(
            attempts.record_failure(now),
            CoreError::InvalidPin {
                remaining_attempts: 1
            }
        ));
        assert!(matches!(
            attempts.record_failure(now),
            CoreError::PinLocked {
                retry_after_secs: 60
            }
        ));

        assert!(attempts.check(now + Duration::seconds(30)).is_err());
        assert!(attempts.check(now + Duration::seconds(61)).is_ok());
        assert_eq!(attempts.failures(), 0);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let now = Utc::now();
        let mut attempts = PinAttempts::new(1, Duration::seconds(10));
        attempts.record_failure(now);

        match attempts.check(now + Duration::milliseconds(9_500)) {
            Err(CoreError::PinLocked { retry_after_secs }) => assert_eq!(retry_after_secs, 1),
            other => panic!("expected lockout, got {:?}", other),
        }
    }

    #[test]
    fn test_success_resets_counter() {
        let now = Utc::now();
        let mut attempts = PinAttempts::default();
        attempts.record_failure(now);
        attempts.record_failure(now);
        attempts.record_success();
        assert_eq!(attempts.failures(), 0);
        assert!(matches!(
            attempts.record_failure(now),
            CoreError::InvalidPin {
                remaining_attempts: 2
            }
        ));
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = PinSession::issue_default("tok", now);

        assert!(session.is_valid_at(now + Duration::hours(23)));
        assert!(!session.is_valid_at(now + Duration::hours(24)));
        assert_eq!(session.remaining_secs(now), 24 * 3600);
        assert_eq!(session.remaining_secs(now + Duration::hours(25)), 0);
    }
}
