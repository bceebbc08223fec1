//! # Error Types
//!
//! Domain-specific error types for cafe-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cafe-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cafe-db errors                                                         │
//! │  └── DbError          - Storage failures, wraps CoreError for checkout │
//! │                                                                         │
//! │  cafe-api errors                                                        │
//! │  └── ApiError         - JSON body + HTTP status                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id is not in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but is switched off in the catalog.
    #[error("Product is not available: {0}")]
    ProductUnavailable(String),

    /// Requested quantity exceeds current stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart line: Latte × 3
    ///      │
    ///      ▼
    /// Conditional decrement: stock = 2
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Latte", available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// Whole checkout rolled back, counter shows "Only 2 Latte left"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Sale id is not in the ledger.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Customer id is not in the registry.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Checkout was attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Register is already open.
    #[error("Cashbox is already open")]
    CashboxAlreadyOpen,

    /// Register is not open.
    #[error("Cashbox is not open")]
    CashboxNotOpen,

    /// Wrong admin PIN.
    #[error("Incorrect PIN, {remaining_attempts} attempts remaining")]
    InvalidPin { remaining_attempts: u32 },

    /// Too many wrong PINs; gate is locked for a while.
    #[error("Too many failed PIN attempts, retry in {retry_after_secs}s")]
    PinLocked { retry_after_secs: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs; nothing has been written when one
/// of these comes back.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Latte".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Latte: available 1, requested 2"
        );

        let err = CoreError::PinLocked {
            retry_after_secs: 42,
        };
        assert_eq!(
            err.to_string(),
            "Too many failed PIN attempts, retry in 42s"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customer_name".to_string(),
        };
        assert_eq!(err.to_string(), "customer_name is required");

        let err = ValidationError::Negative {
            field: "stock".to_string(),
        };
        assert_eq!(err.to_string(), "stock cannot be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
