//! Admin PIN verification and session lifecycle.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::session_token;
use crate::error::{ApiJson, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PinRequest {
    pub pin: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub remaining_secs: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub valid: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub remaining_secs: i64,
}

/// `POST /auth/pin`
pub async fn verify_pin(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PinRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let now = Utc::now();
    let session = state.pin_gate.unlock(&state.db, &body.pin, now).await?;

    Ok(Json(SessionResponse {
        remaining_secs: session.remaining_secs(now),
        token: session.token,
        expires_at: session.expires_at,
    }))
}

/// `GET /auth/session`: whether the presented token is still good.
///
/// Never fails on a bad token; an absent or expired one is just `valid:
/// false`.
pub async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionStatus>> {
    let now = Utc::now();
    let session = match session_token(&headers) {
        Some(token) => state.db.pin_sessions().get_valid(&token, now).await?,
        None => None,
    };

    Ok(Json(match session {
        Some(session) => SessionStatus {
            valid: true,
            remaining_secs: session.remaining_secs(now),
            expires_at: Some(session.expires_at),
        },
        None => SessionStatus {
            valid: false,
            expires_at: None,
            remaining_secs: 0,
        },
    }))
}

/// `DELETE /auth/session`: logout. Idempotent.
pub async fn revoke_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    if let Some(token) = session_token(&headers) {
        if state.db.pin_sessions().revoke(&token).await? {
            info!("Admin session revoked");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
