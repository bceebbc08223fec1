//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Cafe POS                               │
//! │                                                                         │
//! │  Handler -> Result<T, ApiError>                                         │
//! │         │                                                               │
//! │         ├── DbError::NotFound ─────────────► 404 NOT_FOUND              │
//! │         ├── CoreError::Validation ─────────► 400 VALIDATION_ERROR       │
//! │         ├── CoreError::InsufficientStock ──► 409 INSUFFICIENT_STOCK     │
//! │         ├── CoreError::CashboxNotOpen ─────► 409 BUSINESS_LOGIC         │
//! │         ├── DbError::UniqueViolation ──────► 409 CONFLICT               │
//! │         ├── CoreError::InvalidPin ─────────► 401 UNAUTHORIZED           │
//! │         ├── CoreError::PinLocked ──────────► 429 TOO_MANY_ATTEMPTS      │
//! │         └── DbError::QueryFailed ──────────► 500 DATABASE_ERROR         │
//! │                                              (details only in logs)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The client always receives:
//! ```json
//! { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for Latte: available 2, requested 3" }
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use cafe_core::{CoreError, ValidationError};
use cafe_db::DbError;

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Sent as `Retry-After` on lockouts.
    #[serde(skip)]
    pub retry_after_secs: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Not enough units on hand (409)
    InsufficientStock,

    /// Operation not allowed in the current state (409)
    BusinessLogic,

    /// Unique value already taken (409)
    Conflict,

    /// Missing or wrong credentials (401)
    Unauthorized,

    /// PIN gate locked (429)
    TooManyAttempts,

    /// Storage failure (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InsufficientStock | ErrorCode::BusinessLogic | ErrorCode::Conflict => {
                StatusCode::CONFLICT
            }
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::CheckViolation(message) => {
                tracing::warn!("Check constraint rejected write: {}", message);
                ApiError::validation("Value out of allowed range")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::Rule(core) => core.into(),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database is busy, try again")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::SaleNotFound(id) => ApiError::not_found("Sale", &id),
            CoreError::CustomerNotFound(id) => ApiError::not_found("Customer", &id),
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::ProductUnavailable(_)
            | CoreError::CashboxAlreadyOpen
            | CoreError::CashboxNotOpen => ApiError::new(ErrorCode::BusinessLogic, message),
            CoreError::EmptyCart
            | CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. } => ApiError::validation(message),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
            CoreError::InvalidPin { .. } => ApiError::unauthorized(message),
            CoreError::PinLocked { retry_after_secs } => ApiError {
                retry_after_secs: Some(retry_after_secs),
                ..ApiError::new(ErrorCode::TooManyAttempts, message)
            },
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        let retry_after = self.retry_after_secs;
        let mut response = (status, Json(self)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.max(0).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// JSON Body Extractor
// =============================================================================

/// `Json<T>` whose rejection is an [`ApiError`], so malformed bodies get the
/// same `{ code, message }` shape as every other failure.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_statuses() {
        let cases = [
            (CoreError::ProductNotFound("x".into()), StatusCode::NOT_FOUND),
            (CoreError::EmptyCart, StatusCode::BAD_REQUEST),
            (
                CoreError::InsufficientStock {
                    product: "Latte".into(),
                    available: 2,
                    requested: 3,
                },
                StatusCode::CONFLICT,
            ),
            (CoreError::CashboxNotOpen, StatusCode::CONFLICT),
            (
                CoreError::InvalidPin {
                    remaining_attempts: 2,
                },
                StatusCode::UNAUTHORIZED,
            ),
            (
                CoreError::PinLocked {
                    retry_after_secs: 60,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                CoreError::Validation(ValidationError::Required {
                    field: "name".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).code.status(), status);
        }
    }

    #[test]
    fn test_storage_failure_is_generic() {
        let err = ApiError::from(DbError::QueryFailed("disk I/O error at page 7".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("page 7"));
    }

    #[test]
    fn test_rule_inside_db_error_keeps_its_code() {
        let err = ApiError::from(DbError::Rule(CoreError::CashboxAlreadyOpen));
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[test]
    fn test_lockout_sets_retry_after() {
        let response = ApiError::from(CoreError::PinLocked {
            retry_after_secs: 42,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn test_body_shape() {
        let body = serde_json::to_value(ApiError::not_found("Sale", "abc")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "code": "NOT_FOUND", "message": "Sale not found: abc" })
        );
    }
}
