//! # cafe-api: HTTP Server for Cafe POS
//!
//! JSON API for the counter screen and the admin dashboard.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cafe API Server                                  │
//! │                                                                         │
//! │  Browser ───► TraceLayer ───► CorsLayer ───► Router                    │
//! │                                                │                        │
//! │                       ┌────────────────────────┼──────────────────┐    │
//! │                       ▼                        ▼                  ▼    │
//! │               public handlers        AdminSession extractor   /health  │
//! │              (catalog, checkout)     (X-Admin-Session header)          │
//! │                       │                        │                        │
//! │                       └──────────┬─────────────┘                        │
//! │                                  ▼                                      │
//! │                       cafe-db (SQLite, one tx per sale)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cafe_core::TaxRate;
use cafe_db::Database;

use crate::auth::PinGate;
use crate::config::AppConfig;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub pin_gate: Arc<PinGate>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig, pin_gate: PinGate) -> Self {
        AppState {
            db,
            config: Arc::new(config),
            pin_gate: Arc::new(pin_gate),
        }
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.config.store.tax_rate_bps)
    }
}

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    routes::router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
