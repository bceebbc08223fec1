//! # Cashbox State Machine
//!
//! Open/close rules for the register and the reconciliation report produced
//! at closing.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │          open(amount > 0)                                               │
//! │  CLOSED ───────────────────────► OPEN ──┐ record_sale(total)           │
//! │     ▲                              │  ◄──┘                              │
//! │     │      close(counted > 0)      │                                    │
//! │     └──────────────────────────────┘                                    │
//! │                                                                         │
//! │  open while OPEN   → CashboxAlreadyOpen                                 │
//! │  close while CLOSED → CashboxNotOpen                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reconciliation
//! `expected = opening + revenue since opening_time` and
//! `difference = counted − expected`. Revenue comes from the ledger, not from
//! `daily_sales`, so a manual `PUT /cashbox` cannot skew the count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::stats::SalesSummary;
use crate::types::{Cashbox, Sale};
use crate::validation::validate_positive_amount;

// =============================================================================
// Closing Report
// =============================================================================

/// Point-in-time reconciliation handed back when the register closes.
///
/// Returned to the caller only; nothing persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClosingReport {
    pub opening_amount_cents: i64,
    /// Cash counted in the drawer.
    pub closing_amount_cents: i64,
    pub expected_amount_cents: i64,
    /// counted − expected. Negative means the drawer is short.
    pub difference_cents: i64,
    pub revenue_cents: i64,
    pub profit_cents: i64,
    pub items_sold: i64,
    pub transaction_count: i64,
    #[ts(as = "String")]
    pub opening_time: DateTime<Utc>,
    #[ts(as = "String")]
    pub closing_time: DateTime<Utc>,
}

impl ClosingReport {
    /// True when the count matches expectation to the cent.
    pub fn is_balanced(&self) -> bool {
        self.difference_cents == 0
    }
}

// =============================================================================
// Transitions
// =============================================================================

impl Cashbox {
    /// Opens the register with a float.
    ///
    /// Resets `daily_sales` and clears the previous closing fields.
    pub fn open(&mut self, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
        if self.is_open {
            return Err(CoreError::CashboxAlreadyOpen);
        }
        validate_positive_amount("opening_amount", amount)?;

        self.is_open = true;
        self.opening_amount_cents = amount.cents();
        self.opening_time = Some(now);
        self.daily_sales_cents = 0;
        self.closing_time = None;
        self.closing_amount_cents = None;
        Ok(())
    }

    /// Adds a completed sale to the running daily total.
    pub fn record_sale(&mut self, total: Money) {
        self.daily_sales_cents += total.cents();
    }

    /// Closes the register and reconciles the counted cash.
    ///
    /// `ledger` may contain sales from any time; only those created at or
    /// after `opening_time` count toward revenue.
    pub fn close(
        &mut self,
        counted: Money,
        now: DateTime<Utc>,
        ledger: &[Sale],
    ) -> CoreResult<ClosingReport> {
        if !self.is_open {
            return Err(CoreError::CashboxNotOpen);
        }
        validate_positive_amount("closing_amount", counted)?;

        // An open register without a timestamp only comes from a hand-edited
        // record; treat it as opened now so no prior sale is counted.
        let opened_at = self.opening_time.unwrap_or(now);
        let summary = SalesSummary::from_sales(ledger.iter().filter(|s| s.created_at >= opened_at));

        let opening = Money::from_cents(self.opening_amount_cents);
        let expected = opening + summary.revenue();
        let difference = counted - expected;

        self.is_open = false;
        self.closing_time = Some(now);
        self.closing_amount_cents = Some(counted.cents());

        Ok(ClosingReport {
            opening_amount_cents: opening.cents(),
            closing_amount_cents: counted.cents(),
            expected_amount_cents: expected.cents(),
            difference_cents: difference.cents(),
            revenue_cents: summary.revenue_cents,
            profit_cents: summary.profit_cents,
            items_sold: summary.items_sold,
            transaction_count: summary.transaction_count,
            opening_time: opened_at,
            closing_time: now,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, SaleItem, SaleStatus};
    use chrono::Duration;

    fn sale_at(total: i64, at: DateTime<Utc>) -> Sale {
        Sale {
            id: format!("s-{}", total),
            created_at: at,
            items: vec![SaleItem {
                product_id: "p".to_string(),
                name: "Latte".to_string(),
                unit_price_cents: total,
                unit_cost_cents: total / 2,
                quantity: 1,
                subtotal_cents: total,
            }],
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: total,
            profit_cents: total / 2,
            payment_method: PaymentMethod::Cash,
            customer_name: "Juan".to_string(),
            customer_id: None,
            status: SaleStatus::Completed,
        }
    }

    #[test]
    fn test_open_resets_daily_sales() {
        let mut cashbox = Cashbox {
            daily_sales_cents: 12345,
            closing_amount_cents: Some(1),
            ..Cashbox::default()
        };
        let now = Utc::now();
        cashbox.open(Money::from_cents(50000), now).unwrap();

        assert!(cashbox.is_open);
        assert_eq!(cashbox.opening_amount_cents, 50000);
        assert_eq!(cashbox.opening_time, Some(now));
        assert_eq!(cashbox.daily_sales_cents, 0);
        assert_eq!(cashbox.closing_amount_cents, None);
    }

    #[test]
    fn test_open_rejects_non_positive_amount() {
        let mut cashbox = Cashbox::default();
        assert!(matches!(
            cashbox.open(Money::zero(), Utc::now()),
            Err(CoreError::Validation(_))
        ));
        assert!(!cashbox.is_open);
    }

    #[test]
    fn test_double_open_rejected() {
        let mut cashbox = Cashbox::default();
        cashbox.open(Money::from_cents(100), Utc::now()).unwrap();
        assert!(matches!(
            cashbox.open(Money::from_cents(100), Utc::now()),
            Err(CoreError::CashboxAlreadyOpen)
        ));
    }

    #[test]
    fn test_state_error_wins_over_bad_amount() {
        let mut cashbox = Cashbox::default();
        assert!(matches!(
            cashbox.close(Money::zero(), Utc::now(), &[]),
            Err(CoreError::CashboxNotOpen)
        ));

        cashbox.open(Money::from_cents(100), Utc::now()).unwrap();
        assert!(matches!(
            cashbox.open(Money::from_cents(-5), Utc::now()),
            Err(CoreError::CashboxAlreadyOpen)
        ));
        assert!(cashbox.is_open);
        assert_eq!(cashbox.opening_amount_cents, 100);
    }

    #[test]
    fn test_close_when_closed_rejected() {
        let mut cashbox = Cashbox::default();
        assert!(matches!(
            cashbox.close(Money::from_cents(100), Utc::now(), &[]),
            Err(CoreError::CashboxNotOpen)
        ));
    }

    #[test]
    fn test_close_balanced_drawer() {
        let opened = Utc::now() - Duration::hours(8);
        let mut cashbox = Cashbox::default();
        cashbox.open(Money::from_cents(50000), opened).unwrap();

        let ledger = vec![sale_at(10000, opened + Duration::hours(1))];
        cashbox.record_sale(Money::from_cents(10000));

        let closed = opened + Duration::hours(8);
        let report = cashbox
            .close(Money::from_cents(60000), closed, &ledger)
            .unwrap();

        assert_eq!(report.expected_amount_cents, 60000);
        assert_eq!(report.difference_cents, 0);
        assert!(report.is_balanced());
        assert_eq!(report.revenue_cents, 10000);
        assert_eq!(report.transaction_count, 1);
        assert_eq!(report.items_sold, 1);
        assert!(!cashbox.is_open);
        assert_eq!(cashbox.closing_amount_cents, Some(60000));
        assert_eq!(cashbox.closing_time, Some(closed));
    }

    #[test]
    fn test_close_ignores_sales_before_opening() {
        let opened = Utc::now();
        let mut cashbox = Cashbox::default();
        cashbox.open(Money::from_cents(50000), opened).unwrap();

        let ledger = vec![
            sale_at(7000, opened - Duration::hours(20)),
            sale_at(10000, opened + Duration::minutes(5)),
        ];
        let report = cashbox
            .close(Money::from_cents(59000), opened + Duration::hours(1), &ledger)
            .unwrap();

        assert_eq!(report.revenue_cents, 10000);
        assert_eq!(report.expected_amount_cents, 60000);
        assert_eq!(report.difference_cents, -1000);
    }
}
