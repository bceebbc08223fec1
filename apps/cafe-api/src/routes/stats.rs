//! Dashboard statistics.

use axum::extract::State;
use axum::Json;
use chrono::Local;

use cafe_core::stats::day_bounds;
use cafe_core::DailyStats;

use crate::auth::AdminSession;
use crate::error::ApiResult;
use crate::AppState;

/// Best sellers listed on the dashboard.
const TOP_PRODUCTS: usize = 5;

/// `GET /stats/today`: the server's local calendar day.
pub async fn today(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> ApiResult<Json<DailyStats>> {
    let date = Local::now().date_naive();
    let (start, end) = day_bounds(date, &Local);
    let sales = state.db.sales().list_between(start, end).await?;

    Ok(Json(DailyStats::compute(date, &sales, TOP_PRODUCTS)))
}
