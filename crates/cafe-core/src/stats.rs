//! # Sales Statistics
//!
//! Aggregates over the ledger: the dashboard's "today" numbers and the
//! revenue figures the cashbox reconciles against.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentMethod, Sale};

// =============================================================================
// Sales Summary
// =============================================================================

/// Revenue, profit and volume over a set of sales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub revenue_cents: i64,
    pub profit_cents: i64,
    pub items_sold: i64,
    pub transaction_count: i64,
}

impl SalesSummary {
    pub fn from_sales<'a, I>(sales: I) -> Self
    where
        I: IntoIterator<Item = &'a Sale>,
    {
        sales.into_iter().fold(SalesSummary::default(), |mut acc, sale| {
            acc.revenue_cents += sale.total_cents;
            acc.profit_cents += sale.profit_cents;
            acc.items_sold += sale.item_count();
            acc.transaction_count += 1;
            acc
        })
    }

    #[inline]
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.revenue_cents)
    }

    /// Mean sale total, zero when there were no sales.
    pub fn average_ticket(&self) -> Money {
        if self.transaction_count == 0 {
            return Money::zero();
        }
        Money::from_cents(self.revenue_cents / self.transaction_count)
    }
}

// =============================================================================
// Daily Stats
// =============================================================================

/// Revenue split by payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentBreakdown {
    pub payment_method: PaymentMethod,
    pub revenue_cents: i64,
    pub transaction_count: i64,
}

/// Units and revenue of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSales {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

/// The dashboard's numbers for one business day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyStats {
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(flatten)]
    pub summary: SalesSummary,
    pub average_ticket_cents: i64,
    pub by_payment_method: Vec<PaymentBreakdown>,
    /// Best sellers by quantity, at most `top_n` entries.
    pub top_products: Vec<ProductSales>,
}

impl DailyStats {
    /// Builds stats from the sales of `date`.
    ///
    /// The caller selects the sales (see [`day_bounds`]); this only
    /// aggregates them.
    pub fn compute(date: NaiveDate, sales: &[Sale], top_n: usize) -> Self {
        let summary = SalesSummary::from_sales(sales);

        let by_payment_method = PaymentMethod::ALL
            .iter()
            .map(|method| {
                let matching = sales.iter().filter(|s| s.payment_method == *method);
                let part = SalesSummary::from_sales(matching);
                PaymentBreakdown {
                    payment_method: *method,
                    revenue_cents: part.revenue_cents,
                    transaction_count: part.transaction_count,
                }
            })
            .collect();

        let mut per_product: HashMap<&str, ProductSales> = HashMap::new();
        for item in sales.iter().flat_map(|s| s.items.iter()) {
            let entry = per_product
                .entry(item.product_id.as_str())
                .or_insert_with(|| ProductSales {
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    quantity: 0,
                    revenue_cents: 0,
                });
            entry.quantity += item.quantity;
            entry.revenue_cents += item.subtotal_cents;
        }
        let mut top_products: Vec<ProductSales> = per_product.into_values().collect();
        top_products.sort_by(|a, b| {
            b.quantity
                .cmp(&a.quantity)
                .then_with(|| b.revenue_cents.cmp(&a.revenue_cents))
                .then_with(|| a.name.cmp(&b.name))
        });
        top_products.truncate(top_n);

        DailyStats {
            date,
            summary,
            average_ticket_cents: summary.average_ticket().cents(),
            by_payment_method,
            top_products,
        }
    }
}

/// UTC bounds `[start, end)` of a calendar day in the given time zone.
///
/// On a DST gap at midnight the earliest valid instant is used; if the
/// local midnight does not exist at all the day is taken as UTC.
pub fn day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_of = |d: NaiveDate| -> DateTime<Utc> {
        let midnight = d.and_hms_opt(0, 0, 0).unwrap_or_default();
        tz.from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    };
    let next = date.succ_opt().unwrap_or(date + Duration::days(1));
    (start_of(date), start_of(next))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SaleItem, SaleStatus};

    fn sale(method: PaymentMethod, lines: &[(&str, i64, i64)]) -> Sale {
        let items: Vec<SaleItem> = lines
            .iter()
            .map(|(id, price, qty)| SaleItem {
                product_id: id.to_string(),
                name: id.to_uppercase(),
                unit_price_cents: *price,
                unit_cost_cents: price / 2,
                quantity: *qty,
                subtotal_cents: price * qty,
            })
            .collect();
        let total: i64 = items.iter().map(|i| i.subtotal_cents).sum();
        let profit: i64 = items.iter().map(|i| i.profit().cents()).sum();
        Sale {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            items,
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: total,
            profit_cents: profit,
            payment_method: method,
            customer_name: "Ana".to_string(),
            customer_id: None,
            status: SaleStatus::Completed,
        }
    }

    #[test]
    fn test_summary_of_nothing_is_zero() {
        let summary = SalesSummary::from_sales(&[]);
        assert_eq!(summary, SalesSummary::default());
        assert_eq!(summary.average_ticket(), Money::zero());
    }

    #[test]
    fn test_daily_stats() {
        let sales = vec![
            sale(PaymentMethod::Cash, &[("latte", 2000, 2)]),
            sale(PaymentMethod::Nequi, &[("latte", 2000, 1), ("croissant", 1500, 3)]),
        ];
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let stats = DailyStats::compute(date, &sales, 5);

        assert_eq!(stats.summary.revenue_cents, 4000 + 6500);
        assert_eq!(stats.summary.items_sold, 6);
        assert_eq!(stats.summary.transaction_count, 2);
        assert_eq!(stats.average_ticket_cents, 5250);

        let cash = &stats.by_payment_method[0];
        assert_eq!(cash.payment_method, PaymentMethod::Cash);
        assert_eq!(cash.revenue_cents, 4000);
        let credit = &stats.by_payment_method[2];
        assert_eq!(credit.transaction_count, 0);

        assert_eq!(stats.top_products[0].product_id, "latte");
        assert_eq!(stats.top_products[0].quantity, 3);
        assert_eq!(stats.top_products[1].product_id, "croissant");
    }

    #[test]
    fn test_top_products_truncated() {
        let sales = vec![sale(
            PaymentMethod::Cash,
            &[("a", 100, 1), ("b", 100, 2), ("c", 100, 3)],
        )];
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let stats = DailyStats::compute(date, &sales, 2);
        assert_eq!(stats.top_products.len(), 2);
        assert_eq!(stats.top_products[0].product_id, "c");
    }

    #[test]
    fn test_day_bounds_utc() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let (start, end) = day_bounds(date, &Utc);
        assert_eq!(start.to_rfc3339(), "2026-03-31T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-04-01T00:00:00+00:00");
    }

    #[test]
    fn test_day_bounds_fixed_offset() {
        // Bogotá is UTC-5 all year
        let tz = chrono::FixedOffset::west_opt(5 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let (start, _) = day_bounds(date, &tz);
        assert_eq!(start.to_rfc3339(), "2026-10-19T05:00:00+00:00");
    }
}
