//! # Legacy JSON Import
//!
//! Loads the flat JSON files the shop ran on before the database
//! (`productos.json`, `ventas.json`, `clientes.json`, `caja.json`).
//!
//! ```text
//! data/
//! ├── productos.json   [{ id, name, price, cost, category, stock, isActive, ... }]
//! ├── ventas.json      [{ id, date, items[], subtotal, iva, total, paymentMethod, ... }]
//! ├── clientes.json    [{ id, name, phone, email, totalPurchases, totalDebt, ... }]
//! └── caja.json        { isOpen, openingAmount, openingTime, dailySales, ... }
//! ```
//!
//! Amounts in the files are pesos (possibly fractional) and become cents.
//! Records whose id already exists are skipped, so re-running an import is
//! harmless. Missing files are skipped too.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::DbError;
use crate::pool::Database;
use cafe_core::validation::validate_product;
use cafe_core::{Cashbox, Customer, PaymentMethod, Product, Sale, SaleItem, SaleStatus};

pub const PRODUCTS_FILE: &str = "productos.json";
pub const SALES_FILE: &str = "ventas.json";
pub const CUSTOMERS_FILE: &str = "clientes.json";
pub const CASHBOX_FILE: &str = "caja.json";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Db(#[from] DbError),
}

/// What an import run wrote.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub products: usize,
    pub sales: usize,
    pub customers: usize,
    pub cashbox: bool,
    /// Records skipped as duplicates or unreadable.
    pub skipped: usize,
}

/// Converts a peso amount to cents, rounding to the nearest cent.
pub fn pesos_to_cents(pesos: f64) -> i64 {
    (pesos * 100.0).round() as i64
}

// =============================================================================
// Legacy Shapes
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyProduct {
    id: String,
    name: String,
    price: f64,
    #[serde(default)]
    cost: f64,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    stock: Option<i64>,
    #[serde(default = "default_true")]
    is_active: bool,
    description: Option<String>,
    image_url: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

/// Sale lines were written in two shapes over the life of the old app.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySaleItem {
    product_id: String,
    #[serde(alias = "productName")]
    name: String,
    #[serde(alias = "unitPrice")]
    price: f64,
    #[serde(default)]
    cost: f64,
    quantity: i64,
    #[serde(alias = "total")]
    subtotal: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySale {
    id: String,
    date: String,
    #[serde(default)]
    items: Vec<LegacySaleItem>,
    subtotal: f64,
    iva: f64,
    total: f64,
    profit: Option<f64>,
    customer_name: Option<String>,
    payment_method: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCustomer {
    id: String,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    #[serde(default)]
    total_purchases: f64,
    #[serde(default)]
    total_debt: f64,
    last_purchase: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCashbox {
    is_open: bool,
    #[serde(default)]
    opening_amount: f64,
    opening_time: Option<String>,
    #[serde(default)]
    daily_sales: f64,
    closing_time: Option<String>,
    closing_amount: Option<f64>,
}

fn default_true() -> bool {
    true
}

fn parse_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

// =============================================================================
// Import
// =============================================================================

/// Imports every legacy file found in `dir`.
pub async fn import_dir(db: &Database, dir: &Path) -> Result<ImportSummary, ImportError> {
    let mut summary = ImportSummary::default();
    let now = Utc::now();

    if let Some(products) = read_file::<Vec<LegacyProduct>>(dir, PRODUCTS_FILE).await? {
        for legacy in products {
            if db.products().get_by_id(&legacy.id).await?.is_some() {
                summary.skipped += 1;
                continue;
            }
            let product = Product {
                id: legacy.id,
                name: legacy.name,
                description: legacy.description,
                image_url: legacy.image_url,
                category: legacy.category.unwrap_or_else(|| "general".to_string()),
                price_cents: pesos_to_cents(legacy.price),
                cost_cents: pesos_to_cents(legacy.cost),
                stock: legacy.stock.unwrap_or(0).max(0),
                is_active: legacy.is_active,
                created_at: legacy.created_at.unwrap_or(now),
                updated_at: legacy.updated_at.unwrap_or(now),
            };
            if let Err(e) = validate_product(&product) {
                warn!(id = %product.id, error = %e, "Skipping invalid product");
                summary.skipped += 1;
                continue;
            }
            db.products().insert(&product).await?;
            summary.products += 1;
        }
    }

    if let Some(customers) = read_file::<Vec<LegacyCustomer>>(dir, CUSTOMERS_FILE).await? {
        for legacy in customers {
            if db.customers().get_by_id(&legacy.id).await?.is_some() {
                summary.skipped += 1;
                continue;
            }
            let mut customer = Customer::new(legacy.id, legacy.name, now);
            customer.phone = legacy.phone;
            customer.email = legacy.email;
            customer.total_purchases_cents = pesos_to_cents(legacy.total_purchases);
            customer.total_debt_cents = pesos_to_cents(legacy.total_debt);
            customer.last_purchase = parse_time(legacy.last_purchase.as_deref());

            match db.customers().insert(&customer).await {
                Ok(()) => summary.customers += 1,
                Err(DbError::UniqueViolation { .. }) => {
                    warn!(name = %customer.name, "Duplicate customer name, skipped");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    if let Some(sales) = read_file::<Vec<LegacySale>>(dir, SALES_FILE).await? {
        for legacy in sales {
            if db.sales().get_by_id(&legacy.id).await?.is_some() {
                summary.skipped += 1;
                continue;
            }
            match convert_sale(legacy) {
                Some(sale) => {
                    db.sales().insert(&sale).await?;
                    summary.sales += 1;
                }
                None => summary.skipped += 1,
            }
        }
    }

    if let Some(legacy) = read_file::<LegacyCashbox>(dir, CASHBOX_FILE).await? {
        let cashbox = Cashbox {
            is_open: legacy.is_open,
            opening_amount_cents: pesos_to_cents(legacy.opening_amount),
            opening_time: parse_time(legacy.opening_time.as_deref()),
            daily_sales_cents: pesos_to_cents(legacy.daily_sales),
            closing_time: parse_time(legacy.closing_time.as_deref()),
            closing_amount_cents: legacy.closing_amount.map(pesos_to_cents),
        };
        db.cashbox().put(&cashbox).await?;
        summary.cashbox = true;
    }

    info!(
        products = summary.products,
        sales = summary.sales,
        customers = summary.customers,
        cashbox = summary.cashbox,
        skipped = summary.skipped,
        "Legacy import finished"
    );
    Ok(summary)
}

/// Maps a legacy sale; `None` for rows the ledger cannot hold.
fn convert_sale(legacy: LegacySale) -> Option<Sale> {
    let status = legacy.status.as_deref().unwrap_or("completed");
    if status != "completed" {
        warn!(id = %legacy.id, status, "Skipping sale that never completed");
        return None;
    }

    let Some(created_at) = parse_time(Some(&legacy.date)) else {
        warn!(id = %legacy.id, date = %legacy.date, "Skipping sale with unreadable date");
        return None;
    };

    let payment_method = match legacy.payment_method.as_deref() {
        None => PaymentMethod::Cash,
        Some(raw) => match raw.parse::<PaymentMethod>() {
            Ok(method) => method,
            Err(_) => {
                warn!(id = %legacy.id, method = raw, "Skipping sale with unknown payment method");
                return None;
            }
        },
    };

    let items: Vec<SaleItem> = legacy
        .items
        .into_iter()
        .map(|i| {
            let unit_price_cents = pesos_to_cents(i.price);
            SaleItem {
                product_id: i.product_id,
                name: i.name,
                unit_price_cents,
                unit_cost_cents: pesos_to_cents(i.cost),
                quantity: i.quantity,
                subtotal_cents: i
                    .subtotal
                    .map(pesos_to_cents)
                    .unwrap_or(unit_price_cents * i.quantity),
            }
        })
        .collect();

    let profit_cents = match legacy.profit {
        Some(p) => pesos_to_cents(p),
        None => items.iter().map(|i| i.profit().cents()).sum(),
    };

    Some(Sale {
        id: legacy.id,
        created_at,
        items,
        subtotal_cents: pesos_to_cents(legacy.subtotal),
        tax_cents: pesos_to_cents(legacy.iva),
        total_cents: pesos_to_cents(legacy.total),
        profit_cents,
        payment_method,
        customer_name: legacy
            .customer_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Cliente".to_string()),
        customer_id: None,
        status: SaleStatus::Completed,
    })
}

async fn read_file<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Option<T>, ImportError> {
    let path = dir.join(file);
    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(file, "Legacy file not present, skipping");
            return Ok(None);
        }
        Err(source) => {
            return Err(ImportError::Io {
                file: file.to_string(),
                source,
            })
        }
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| ImportError::Json {
            file: file.to_string(),
            source,
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
