use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::models::users::{QuestSlot, QuestSlots, SlotKind};
use crate::services::catalog::CatalogRequest;
use crate::services::rewards::RewardsRequest;

/// Caller-supplied wall clock, epoch milliseconds.
#[derive(Deserialize)]
pub struct TimedRequest {
    user_time_ms: i64,
}

#[derive(Serialize)]
struct SlotStatusResponse {
    completed: bool,
    daily: bool,
    completed_day_ms: i64,
}

impl SlotStatusResponse {
    fn new(slot: &QuestSlot, kind: SlotKind) -> Self {
        SlotStatusResponse {
            completed: slot.completed,
            daily: kind.is_daily(),
            completed_day_ms: slot.completed_day.timestamp_millis(),
        }
    }
}

#[derive(Serialize)]
struct QuestBundleResponse {
    join_channel: SlotStatusResponse,
    follow_social: SlotStatusResponse,
    post_social: SlotStatusResponse,
    daily_check_in: SlotStatusResponse,
    refer_friend: SlotStatusResponse,
}

impl From<QuestSlots> for QuestBundleResponse {
    fn from(quests: QuestSlots) -> Self {
        QuestBundleResponse {
            join_channel: SlotStatusResponse::new(&quests.join_channel, SlotKind::JoinChannel),
            follow_social: SlotStatusResponse::new(&quests.follow_social, SlotKind::FollowSocial),
            post_social: SlotStatusResponse::new(&quests.post_social, SlotKind::PostSocial),
            daily_check_in: SlotStatusResponse::new(
                &quests.daily_check_in,
                SlotKind::DailyCheckIn,
            ),
            refer_friend: SlotStatusResponse::new(&quests.refer_friend, SlotKind::ReferFriend),
        }
    }
}

pub async fn get_quest_status(
    State(state): State<super::AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<TimedRequest>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    let sent = state
        .rewards_channel
        .send(RewardsRequest::QuestStatus {
            username: user_id,
            user_time_ms: req.user_time_ms,
            response: tx,
        })
        .await;
    if let Err(e) = sent {
        return super::channel_error(e.to_string());
    }

    match rx.await {
        Ok(Ok(quests)) => (
            StatusCode::OK,
            Json(json!(QuestBundleResponse::from(quests))),
        ),
        Ok(Err(err)) => super::error_response(err),
        Err(e) => super::channel_error(e.to_string()),
    }
}

pub async fn claim_slot(
    State(state): State<super::AppState>,
    Path((user_id, slot)): Path<(String, String)>,
    Json(req): Json<TimedRequest>,
) -> impl IntoResponse {
    let Some(slot) = SlotKind::parse(&slot) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Unknown quest slot: {slot}") })),
        );
    };

    let (tx, rx) = oneshot::channel();

    let sent = state
        .rewards_channel
        .send(RewardsRequest::ClaimSlot {
            username: user_id,
            slot,
            user_time_ms: req.user_time_ms,
            response: tx,
        })
        .await;
    if let Err(e) = sent {
        return super::channel_error(e.to_string());
    }

    match rx.await {
        Ok(Ok(points)) => (
            StatusCode::OK,
            Json(json!({ "msg": "Quest claimed", "points_awarded": points })),
        ),
        Ok(Err(err)) => super::error_response(err),
        Err(e) => super::channel_error(e.to_string()),
    }
}

pub async fn complete_catalog(
    State(state): State<super::AppState>,
    Path((user_id, quest_id)): Path<(String, Uuid)>,
    Json(req): Json<TimedRequest>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    let sent = state
        .catalog_channel
        .send(CatalogRequest::Complete {
            username: user_id,
            quest_id,
            user_time_ms: req.user_time_ms,
            response: tx,
        })
        .await;
    if let Err(e) = sent {
        return super::channel_error(e.to_string());
    }

    match rx.await {
        Ok(Ok(points)) => (
            StatusCode::OK,
            Json(json!({ "msg": "Quest is completed", "points_awarded": points })),
        ),
        Ok(Err(err)) => super::error_response(err),
        Err(e) => super::channel_error(e.to_string()),
    }
}

pub async fn catalog_status(
    State(state): State<super::AppState>,
    Path((user_id, quest_id)): Path<(String, Uuid)>,
) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();

    let sent = state
        .catalog_channel
        .send(CatalogRequest::Status {
            username: user_id,
            quest_id,
            response: tx,
        })
        .await;
    if let Err(e) = sent {
        return super::channel_error(e.to_string());
    }

    match rx.await {
        Ok(Ok(status)) => (StatusCode::OK, Json(json!(status))),
        Ok(Err(err)) => super::error_response(err),
        Err(e) => super::channel_error(e.to_string()),
    }
}
