//! Customer registry endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use cafe_core::validation::{
    validate_customer_name, validate_email, validate_phone, validate_price,
};
use cafe_core::{Customer, Sale};

use crate::auth::AdminSession;
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::routes::IdBody;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Replacement body. Purchase totals are owned by checkout; only the debt
/// can be corrected by hand (a customer paying off credit).
#[derive(Debug, Deserialize)]
pub struct CustomerUpdate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub total_debt_cents: Option<i64>,
}

/// Blank optional fields are stored as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `GET /customers`: sorted by name.
pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list().await?))
}

/// `POST /customers`
pub async fn create_customer(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(input): ApiJson<CustomerInput>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let name = validate_customer_name(&input.name)?;
    validate_phone(input.phone.as_deref())?;
    validate_email(input.email.as_deref())?;

    let mut customer = Customer::new(Uuid::new_v4().to_string(), name, Utc::now());
    customer.phone = non_blank(input.phone);
    customer.email = non_blank(input.email);

    state.db.customers().insert(&customer).await?;
    info!(id = %customer.id, name = %customer.name, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

/// `PUT /customers`
pub async fn update_customer(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(input): ApiJson<CustomerUpdate>,
) -> ApiResult<Json<Customer>> {
    let name = validate_customer_name(&input.name)?;
    validate_phone(input.phone.as_deref())?;
    validate_email(input.email.as_deref())?;
    if let Some(debt) = input.total_debt_cents {
        validate_price("total_debt_cents", debt)?;
    }

    let mut customer = state
        .db
        .customers()
        .get_by_id(&input.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", &input.id))?;

    customer.name = name;
    customer.phone = non_blank(input.phone);
    customer.email = non_blank(input.email);
    if let Some(debt) = input.total_debt_cents {
        customer.total_debt_cents = debt;
    }

    let updated = state.db.customers().update(&customer).await?;
    info!(id = %updated.id, "Customer updated");
    Ok(Json(updated))
}

/// `DELETE /customers` with `{ "id": ... }`
pub async fn delete_customer(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(body): ApiJson<IdBody>,
) -> ApiResult<StatusCode> {
    state.db.customers().delete(&body.id).await?;
    info!(id = %body.id, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /customers/{id}/history`: newest first.
pub async fn customer_history(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Sale>>> {
    let customer = state
        .db
        .customers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", &id))?;

    Ok(Json(state.db.sales().list_for_customer(&customer).await?))
}
