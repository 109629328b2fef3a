use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::oneshot;

use crate::models::users::SpinState;
use crate::services::rewards::RewardsRequest;

#[derive(Serialize)]
struct SpinStatusResponse {
    count: i64,
    unlock_duration_ms: i64,
    last_update_ms: i64,
}

impl From<SpinState> for SpinStatusResponse {
    fn from(spin: SpinState) -> Self {
        SpinStatusResponse {
            count: spin.count,
            unlock_duration_ms: spin.unlock_ms,
            last_update_ms: spin.last_update.timestamp_millis(),
        }
    }
}

pub async fn get_spin_status(
    State(state): State<super::AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    let sent = state
        .rewards_channel
        .send(RewardsRequest::SpinStatus {
            username: user_id,
            response: tx,
        })
        .await;
    if let Err(e) = sent {
        return super::channel_error(e.to_string());
    }

    match rx.await {
        Ok(Ok(spin)) => (
            StatusCode::OK,
            Json(json!(SpinStatusResponse::from(spin))),
        ),
        Ok(Err(err)) => super::error_response(err),
        Err(e) => super::channel_error(e.to_string()),
    }
}

pub async fn spin(
    State(state): State<super::AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    let sent = state
        .rewards_channel
        .send(RewardsRequest::Spin {
            username: user_id,
            response: tx,
        })
        .await;
    if let Err(e) = sent {
        return super::channel_error(e.to_string());
    }

    match rx.await {
        Ok(Ok(draw)) => (StatusCode::OK, Json(json!(draw))),
        Ok(Err(err)) => super::error_response(err),
        Err(e) => super::channel_error(e.to_string()),
    }
}
