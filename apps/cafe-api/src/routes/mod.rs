//! # HTTP Routes
//!
//! One module per resource; admin-only handlers take an
//! [`AdminSession`](crate::auth::AdminSession) argument.
//!
//! | Module | Paths |
//! |--------|-------|
//! | `health` | `/health` |
//! | `auth` | `/auth/pin`, `/auth/session` |
//! | `products` | `/products`, `/products/{id}`, `/products/{id}/stock`, `/products/low-stock` |
//! | `sales` | `/sales`, `/sales/{id}`, `/sales/{id}/receipt` |
//! | `customers` | `/customers`, `/customers/{id}/history` |
//! | `cashbox` | `/cashbox`, `/cashbox/open`, `/cashbox/close` |
//! | `stats` | `/stats/today` |

pub mod auth;
pub mod cashbox;
pub mod customers;
pub mod health;
pub mod products;
pub mod sales;
pub mod stats;

use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::AppState;

/// Body of the `DELETE` endpoints, which take the id in the body.
#[derive(Debug, Deserialize)]
pub struct IdBody {
    pub id: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/auth/pin", post(auth::verify_pin))
        .route(
            "/auth/session",
            get(auth::session_status).delete(auth::revoke_session),
        )
        .route(
            "/products",
            get(products::list_products)
                .post(products::create_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/products/low-stock", get(products::low_stock))
        .route("/products/{id}", get(products::get_product))
        .route("/products/{id}/stock", get(products::get_stock))
        .route("/sales", get(sales::list_sales).post(sales::complete_sale))
        .route("/sales/{id}", get(sales::get_sale))
        .route("/sales/{id}/receipt", get(sales::get_receipt))
        .route(
            "/customers",
            get(customers::list_customers)
                .post(customers::create_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/customers/{id}/history", get(customers::customer_history))
        .route(
            "/cashbox",
            get(cashbox::get_cashbox).put(cashbox::replace_cashbox),
        )
        .route("/cashbox/open", post(cashbox::open_cashbox))
        .route("/cashbox/close", post(cashbox::close_cashbox))
        .route("/stats/today", get(stats::today))
}
