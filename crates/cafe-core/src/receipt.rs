//! # Receipt
//!
//! Receipt layout for a completed sale: a JSON-friendly struct for the web
//! modal and a fixed-width text rendering for the thermal printer.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentMethod, Sale};

const RECEIPT_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

/// Everything printed on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receipt {
    pub store_name: String,
    pub sale_id: String,
    /// RFC 3339 timestamp of the sale.
    pub timestamp: String,
    pub customer_name: String,
    pub payment_method: PaymentMethod,
    pub items: Vec<ReceiptLine>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl Receipt {
    pub fn from_sale(sale: &Sale, store_name: impl Into<String>) -> Self {
        Receipt {
            store_name: store_name.into(),
            sale_id: sale.id.clone(),
            timestamp: sale.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            customer_name: sale.customer_name.clone(),
            payment_method: sale.payment_method,
            items: sale
                .items
                .iter()
                .map(|i| ReceiptLine {
                    name: i.name.clone(),
                    quantity: i.quantity,
                    unit_price_cents: i.unit_price_cents,
                    subtotal_cents: i.subtotal_cents,
                })
                .collect(),
            subtotal_cents: sale.subtotal_cents,
            tax_cents: sale.tax_cents,
            total_cents: sale.total_cents,
        }
    }

    /// Plain-text rendering, 40 columns wide.
    pub fn render_text(&self) -> String {
        let rule = "-".repeat(RECEIPT_WIDTH);
        let mut out = String::new();

        out.push_str(&center(&self.store_name));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        // First UUID block; the full id overflows the line
        let short_id: String = self.sale_id.chars().take(8).collect();
        out.push_str(&format!("Sale: {}\n", short_id));
        out.push_str(&format!("Date: {}\n", self.timestamp));
        out.push_str(&format!("Customer: {}\n", self.customer_name));
        out.push_str(&rule);
        out.push('\n');

        for line in &self.items {
            let left = format!("{} x{}", line.name, line.quantity);
            out.push_str(&two_columns(&left, &Money::from_cents(line.subtotal_cents).to_string()));
        }

        out.push_str(&rule);
        out.push('\n');
        out.push_str(&two_columns("Subtotal", &Money::from_cents(self.subtotal_cents).to_string()));
        out.push_str(&two_columns("IVA", &Money::from_cents(self.tax_cents).to_string()));
        out.push_str(&two_columns("TOTAL", &Money::from_cents(self.total_cents).to_string()));
        out.push_str(&two_columns("Payment", self.payment_method.as_str()));
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&center("Thank you!"));
        out.push('\n');
        out
    }
}

fn center(text: &str) -> String {
    format!("{:^width$}", text, width = RECEIPT_WIDTH)
}

fn two_columns(left: &str, right: &str) -> String {
    let pad = RECEIPT_WIDTH.saturating_sub(left.chars().count() + right.chars().count());
    format!("{}{}{}\n", left, " ".repeat(pad.max(1)), right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SaleItem, SaleStatus};
    use chrono::Utc;

    fn sample_sale() -> Sale {
        Sale {
            id: "sale-1".to_string(),
            created_at: Utc::now(),
            items: vec![
                SaleItem {
                    product_id: "a".to_string(),
                    name: "Latte".to_string(),
                    unit_price_cents: 2000,
                    unit_cost_cents: 800,
                    quantity: 1,
                    subtotal_cents: 2000,
                },
                SaleItem {
                    product_id: "b".to_string(),
                    name: "Croissant".to_string(),
                    unit_price_cents: 1500,
                    unit_cost_cents: 600,
                    quantity: 2,
                    subtotal_cents: 3000,
                },
            ],
            subtotal_cents: 4050,
            tax_cents: 950,
            total_cents: 5000,
            profit_cents: 3000,
            payment_method: PaymentMethod::Nequi,
            customer_name: "Juan".to_string(),
            customer_id: Some("c-1".to_string()),
            status: SaleStatus::Completed,
        }
    }

    #[test]
    fn test_receipt_copies_sale() {
        let receipt = Receipt::from_sale(&sample_sale(), "Cafeteria");
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[1].quantity, 2);
        assert_eq!(receipt.total_cents, 5000);
        assert_eq!(receipt.store_name, "Cafeteria");
    }

    #[test]
    fn test_render_text() {
        let text = Receipt::from_sale(&sample_sale(), "Cafeteria").render_text();
        assert!(text.contains("Croissant x2"));
        assert!(text.contains("$50.00"));
        assert!(text.contains("nequi"));
        for line in text.lines() {
            assert!(line.chars().count() <= RECEIPT_WIDTH, "line too wide: {}", line);
        }
    }
}
