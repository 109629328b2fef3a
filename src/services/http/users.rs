use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use crate::models::telegram::Update;
use crate::services::users::UserRequest;

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct EndEventRequest {
    password: String,
}

pub async fn get_user(
    State(state): State<super::AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    let sent = state
        .user_channel
        .send(UserRequest::GetUser {
            username: user_id,
            response: tx,
        })
        .await;
    if let Err(e) = sent {
        return super::channel_error(e.to_string());
    }

    match rx.await {
        Ok(Ok(user)) => (StatusCode::OK, Json(json!(user))),
        Ok(Err(err)) => super::error_response(err),
        Err(e) => super::channel_error(e.to_string()),
    }
}

pub async fn get_leaderboard(
    State(state): State<super::AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    let sent = state
        .user_channel
        .send(UserRequest::Leaderboard {
            limit: query.limit.unwrap_or(100),
            response: tx,
        })
        .await;
    if let Err(e) = sent {
        return super::channel_error(e.to_string());
    }

    match rx.await {
        Ok(Ok(snapshots)) => (StatusCode::OK, Json(json!(snapshots))),
        Ok(Err(err)) => super::error_response(err),
        Err(e) => super::channel_error(e.to_string()),
    }
}

pub async fn end_event(
    State(state): State<super::AppState>,
    Json(req): Json<EndEventRequest>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    let sent = state
        .user_channel
        .send(UserRequest::EndEvent {
            password: req.password,
            response: tx,
        })
        .await;
    if let Err(e) = sent {
        return super::channel_error(e.to_string());
    }

    match rx.await {
        Ok(Ok(assigned)) => (
            StatusCode::OK,
            Json(json!({ "msg": "Success", "tokens_assigned": assigned })),
        ),
        Ok(Err(err)) => super::error_response(err),
        Err(e) => super::channel_error(e.to_string()),
    }
}

/// Telegram pushes every update here. Registration happens on `/start`;
/// anything else is acknowledged and dropped. Telegram retries non-200
/// responses, so this endpoint always answers 200.
pub async fn telegram_webhook(
    State(state): State<super::AppState>,
    Json(update): Json<Update>,
) -> impl IntoResponse {
    let Some(message) = update.message else {
        return (StatusCode::OK, Json(json!({ "ok": true })));
    };

    let (Some(payload), Some(username)) = (message.start_payload(), message.sender_identity())
    else {
        return (StatusCode::OK, Json(json!({ "ok": true })));
    };

    let (tx, rx) = oneshot::channel();

    let sent = state
        .user_channel
        .send(UserRequest::Register {
            username,
            chat_id: message.chat.id.to_string(),
            referrer: payload,
            response: tx,
        })
        .await;
    if let Err(e) = sent {
        log::error!("Could not queue registration from webhook: {e}");
        return (StatusCode::OK, Json(json!({ "ok": true })));
    }

    match rx.await {
        Ok(Ok(registration)) => {
            if registration.created {
                log::info!(
                    "Registered {} (referral credited: {})",
                    registration.user.username,
                    registration.referral_credited
                );
            }
        }
        Ok(Err(err)) => log::error!("Webhook registration failed: {err}"),
        Err(e) => log::error!("Webhook registration reply lost: {e}"),
    }

    (StatusCode::OK, Json(json!({ "ok": true })))
}
