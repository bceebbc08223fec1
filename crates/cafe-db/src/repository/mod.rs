//! # Repository Module
//!
//! One repository per persisted collection. Each holds a clone of the pool
//! and is handed out by [`crate::Database`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  axum handler                                                           │
//! │       │  db.products().decrement_stock(id, 2)                           │
//! │       ▼                                                                 │
//! │  ProductRepository ─── SQL ───► SQLite                                  │
//! │                                                                         │
//! │  ProductRepository     products        catalog, stock                   │
//! │  SaleRepository        sales + items   ledger (append-only)             │
//! │  CustomerRepository    customers       registry                         │
//! │  CashboxRepository     cashbox         register singleton               │
//! │  PinSessionRepository  pin_sessions    admin sessions                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Statements that checkout also runs inside its transaction are exposed as
//! free functions generic over [`sqlx::SqliteExecutor`], so the pool-level
//! method and the transactional path share one query.

pub mod cashbox;
pub mod customer;
pub mod pin_session;
pub mod product;
pub mod sale;

pub use cashbox::CashboxRepository;
pub use customer::CustomerRepository;
pub use pin_session::PinSessionRepository;
pub use product::ProductRepository;
pub use sale::SaleRepository;
