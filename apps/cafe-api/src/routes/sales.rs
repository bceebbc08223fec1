//! Ledger and checkout endpoints.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use cafe_core::{Cart, CartLine, PaymentMethod, Receipt, Sale};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    pub customer_name: String,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReceiptParams {
    /// `text` for the printable rendering, JSON otherwise.
    pub format: Option<String>,
}

/// `GET /sales`: newest first.
pub async fn list_sales(State(state): State<AppState>) -> ApiResult<Json<Vec<Sale>>> {
    Ok(Json(state.db.sales().list().await?))
}

/// `POST /sales`: completes a sale in one transaction.
pub async fn complete_sale(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Sale>)> {
    let cart = Cart::from_lines(request.items)?;
    let sale = state
        .db
        .checkout()
        .complete_sale(
            &cart,
            &request.customer_name,
            request.payment_method,
            state.tax_rate(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(sale)))
}

/// `GET /sales/{id}`
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Sale>> {
    fetch_sale(&state, &id).await.map(Json)
}

/// `GET /sales/{id}/receipt?format=text`
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ReceiptParams>,
) -> ApiResult<Response> {
    let sale = fetch_sale(&state, &id).await?;
    let receipt = Receipt::from_sale(&sale, state.config.store.name.clone());

    match params.format.as_deref() {
        Some("text") => Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            receipt.render_text(),
        )
            .into_response()),
        None | Some("json") => Ok(Json(receipt).into_response()),
        Some(other) => Err(ApiError::validation(format!(
            "format must be one of: json, text (got '{}')",
            other
        ))),
    }
}

async fn fetch_sale(state: &AppState, id: &str) -> ApiResult<Sale> {
    state
        .db
        .sales()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", id))
}
