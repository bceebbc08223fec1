//! # Validation Module
//!
//! Input validation for everything that enters through the API.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web frontend                                                  │
//! │  └── Blocks empty carts / names before the request                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: axum extractors                                               │
//! │  └── Type validation (JSON deserialization)                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: THIS MODULE                                                   │
//! │  └── Business rules (lengths, ranges, positive amounts)                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite                                                        │
//! │  └── CHECK (stock >= 0), NOT NULL, foreign keys                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Product;
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_CUSTOMER_NAME_LEN: usize = 100;
const MAX_CATEGORY_LEN: usize = 50;

// =============================================================================
// String Validators
// =============================================================================

fn required_trimmed<'a>(field: &str, value: &'a str, max: usize) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(value)
}

/// Validates a product name (1-200 characters after trimming).
///
/// ```rust
/// use cafe_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Cappuccino").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required_trimmed("name", name, MAX_NAME_LEN).map(|_| ())
}

/// Validates the customer name typed at checkout and returns it trimmed.
///
/// ## User Workflow
/// ```text
/// Counter: "Cobrar" with customer "  Juan "
///      │
///      ▼
/// validate_customer_name ← THIS FUNCTION
///      │
///      ├── empty after trim? → Required
///      │
///      └── OK("Juan") → used for the case-insensitive registry lookup
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    required_trimmed("customer_name", name, MAX_CUSTOMER_NAME_LEN).map(str::to_string)
}

pub fn validate_category(category: &str) -> ValidationResult<()> {
    required_trimmed("category", category, MAX_CATEGORY_LEN).map(|_| ())
}

/// Optional email: when present it needs an `@` with text on both sides.
pub fn validate_email(email: Option<&str>) -> ValidationResult<()> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(());
    };
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected name@domain".to_string(),
        }),
    }
}

/// Optional phone: digits, spaces, dashes and a leading `+`.
pub fn validate_phone(phone: Option<&str>) -> ValidationResult<()> {
    let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(());
    };
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if digits
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
    {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces and dashes".to_string(),
        })
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart line quantity (1..=999).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Price or cost in cents, `0..=MAX_PRICE_CENTS`. Zero is allowed
/// (courtesy items).
pub fn validate_price(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::Negative {
            field: "stock".to_string(),
        });
    }
    Ok(())
}

/// Register amounts must be strictly positive.
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates every admin-editable product field.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_category(&product.category)?;
    validate_price("price_cents", product.price_cents)?;
    validate_price("cost_cents", product.cost_cents)?;
    validate_stock(product.stock)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_name_is_trimmed() {
        assert_eq!(validate_customer_name("  Juan ").unwrap(), "Juan");
        assert!(validate_customer_name("").is_err());
        assert!(validate_customer_name("   ").is_err());
        assert!(validate_customer_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price("price_cents", 0).is_ok());
        assert!(validate_price("price_cents", -1).is_err());
        assert!(validate_price("price_cents", MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price("price_cents", MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_price("price_cents", 4_000_000_000_000_000_000).is_err());
    }

    #[test]
    fn test_price_cap_keeps_full_cart_in_range() {
        let full_cart = MAX_PRICE_CENTS
            .checked_mul(MAX_ITEM_QUANTITY)
            .and_then(|line| line.checked_mul(crate::MAX_CART_ITEMS as i64));
        // Headroom for many such sales on one customer or register
        assert!(full_cart.is_some_and(|total| total < i64::MAX / 100));
    }

    #[test]
    fn test_positive_amount() {
        assert!(validate_positive_amount("opening_amount", Money::from_cents(1)).is_ok());
        assert!(validate_positive_amount("opening_amount", Money::zero()).is_err());
        assert!(validate_positive_amount("opening_amount", Money::from_cents(-5)).is_err());
    }

    #[test]
    fn test_contact_fields() {
        assert!(validate_email(None).is_ok());
        assert!(validate_email(Some("")).is_ok());
        assert!(validate_email(Some("ana@cafe.co")).is_ok());
        assert!(validate_email(Some("ana.cafe.co")).is_err());

        assert!(validate_phone(Some("+57 300 123-4567")).is_ok());
        assert!(validate_phone(Some("call me")).is_err());
    }
}
