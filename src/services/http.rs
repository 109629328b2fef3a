use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use super::catalog::CatalogRequest;
use super::rewards::RewardsRequest;
use super::users::UserRequest;
use super::ServiceError;

mod quests;
mod rewards;
mod users;

#[derive(Clone)]
struct AppState {
    user_channel: mpsc::Sender<UserRequest>,
    rewards_channel: mpsc::Sender<RewardsRequest>,
    catalog_channel: mpsc::Sender<CatalogRequest>,
}

fn error_response(err: ServiceError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match err {
        ServiceError::UserNotFound | ServiceError::QuestNotFound => StatusCode::NOT_FOUND,
        ServiceError::InvalidRequest(_) | ServiceError::InvalidTimestamp => StatusCode::BAD_REQUEST,
        ServiceError::InsufficientSpins | ServiceError::AlreadyClaimed => StatusCode::CONFLICT,
        ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        ServiceError::Internal(_) | ServiceError::Database(_) | ServiceError::Communication(..) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    // store and internal details stay in the logs, not on the wire
    let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("Request failed: {err}");
        json!({ "error": "Internal server error" })
    } else {
        json!({ "error": err.to_string() })
    };

    (status, Json(body))
}

fn channel_error(detail: String) -> (StatusCode, Json<serde_json::Value>) {
    error_response(ServiceError::Communication("http".to_string(), detail))
}

pub async fn start_http_server(
    listen: &str,
    user_channel: mpsc::Sender<UserRequest>,
    rewards_channel: mpsc::Sender<RewardsRequest>,
    catalog_channel: mpsc::Sender<CatalogRequest>,
) -> Result<(), anyhow::Error> {
    let app_state = AppState {
        user_channel,
        rewards_channel,
        catalog_channel,
    };

    let app = Router::new()
        .route("/users/{id}", get(users::get_user))
        .route(
            "/users/{id}/spin",
            get(rewards::get_spin_status).post(rewards::spin),
        )
        .route("/users/{id}/quests", post(quests::get_quest_status))
        .route("/users/{id}/quests/{slot}/claim", post(quests::claim_slot))
        .route(
            "/users/{id}/catalog/{quest_id}",
            get(quests::catalog_status),
        )
        .route(
            "/users/{id}/catalog/{quest_id}/complete",
            post(quests::complete_catalog),
        )
        .route("/leaderboard", get(users::get_leaderboard))
        .route("/event/end", post(users::end_event))
        .route("/telegram/webhook", post(users::telegram_webhook))
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
