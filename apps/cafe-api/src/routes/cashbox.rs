//! Register endpoints.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use cafe_core::validation::validate_price;
use cafe_core::{Cashbox, ClosingReport, Money};

use crate::auth::AdminSession;
use crate::error::{ApiJson, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenRequest {
    /// Float placed in the drawer.
    pub amount_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    /// Cash counted in the drawer.
    pub counted_cents: i64,
}

/// `GET /cashbox`
pub async fn get_cashbox(State(state): State<AppState>) -> ApiResult<Json<Cashbox>> {
    Ok(Json(state.db.cashbox().get().await?))
}

/// `PUT /cashbox`: admin correction of the stored record.
pub async fn replace_cashbox(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(cashbox): ApiJson<Cashbox>,
) -> ApiResult<Json<Cashbox>> {
    validate_price("opening_amount_cents", cashbox.opening_amount_cents)?;
    validate_price("daily_sales_cents", cashbox.daily_sales_cents)?;
    if let Some(closing) = cashbox.closing_amount_cents {
        validate_price("closing_amount_cents", closing)?;
    }

    info!(is_open = cashbox.is_open, "Cashbox record replaced by admin");
    Ok(Json(state.db.cashbox().put(&cashbox).await?))
}

/// `POST /cashbox/open`
pub async fn open_cashbox(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(request): ApiJson<OpenRequest>,
) -> ApiResult<Json<Cashbox>> {
    let cashbox = state
        .db
        .cashbox()
        .open(Money::from_cents(request.amount_cents), Utc::now())
        .await?;
    Ok(Json(cashbox))
}

/// `POST /cashbox/close`: returns the reconciliation.
pub async fn close_cashbox(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(request): ApiJson<CloseRequest>,
) -> ApiResult<Json<ClosingReport>> {
    let report = state
        .db
        .cashbox()
        .close(Money::from_cents(request.counted_cents), Utc::now())
        .await?;
    Ok(Json(report))
}
