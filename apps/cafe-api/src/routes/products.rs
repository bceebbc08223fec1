//! Catalog endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use cafe_core::validation::validate_product;
use cafe_core::Product;

use crate::auth::AdminSession;
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::routes::IdBody;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Only products that can be sold.
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<i64>,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_active() -> bool {
    true
}

/// Admin-editable product fields. Used for create (no id) and replace (id
/// required).
#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: i64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl ProductInput {
    fn into_product(self, id: String, created_at: chrono::DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            image_url: self.image_url,
            category: self.category.trim().to_string(),
            price_cents: self.price_cents,
            cost_cents: self.cost_cents,
            stock: self.stock,
            is_active: self.is_active,
            created_at,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub product_id: String,
    pub stock: i64,
}

/// `GET /products?active=true`
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list(params.active).await?))
}

/// `GET /products/{id}`
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", &id))
}

/// `GET /products/{id}/stock`: zero for an unknown id.
pub async fn get_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StockResponse>> {
    let stock = state.db.products().get_stock(&id).await?;
    Ok(Json(StockResponse {
        product_id: id,
        stock,
    }))
}

/// `GET /products/low-stock?threshold=n`
pub async fn low_stock(
    State(state): State<AppState>,
    Query(params): Query<LowStockParams>,
) -> ApiResult<Json<Vec<Product>>> {
    let threshold = params
        .threshold
        .unwrap_or(state.config.store.low_stock_threshold);
    if threshold < 0 {
        return Err(ApiError::validation("threshold cannot be negative"));
    }
    Ok(Json(state.db.products().low_stock(threshold).await?))
}

/// `POST /products`: the server assigns id and timestamps.
pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = input.into_product(Uuid::new_v4().to_string(), Utc::now());
    validate_product(&product)?;

    state.db.products().insert(&product).await?;
    info!(id = %product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /products`: replaces every editable field of an existing product.
pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<Json<Product>> {
    let id = input
        .id
        .clone()
        .ok_or_else(|| ApiError::validation("id is required"))?;
    let existing = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    let product = input.into_product(id, existing.created_at);
    validate_product(&product)?;

    let updated = state.db.products().update(&product).await?;
    info!(id = %updated.id, stock = updated.stock, "Product updated");
    Ok(Json(updated))
}

/// `DELETE /products` with `{ "id": ... }`. Past sales keep their snapshot.
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(body): ApiJson<IdBody>,
) -> ApiResult<StatusCode> {
    state.db.products().delete(&body.id).await?;
    info!(id = %body.id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
