use async_trait::async_trait;
use serde_json::json;

use super::{RequestHandler, Service};
use crate::settings::Telegram;

/// Outbound notifications. Delivery is best-effort by design: reward state
/// is already committed by the time a request lands here, so failures are
/// logged and dropped, never bubbled back.
pub enum TelegramRequest {
    Welcome {
        chat_id: String,
        username: String,
    },
    ReferralCredited {
        chat_id: String,
        referee: String,
        bonus_spins: i64,
        bonus_points: i64,
    },
}

#[derive(Clone)]
pub struct TelegramRequestHandler {
    client: reqwest::Client,
    settings: Telegram,
}

impl TelegramRequestHandler {
    pub fn new(settings: Telegram) -> Self {
        TelegramRequestHandler {
            client: reqwest::Client::new(),
            settings,
        }
    }

    async fn send_message(&self, chat_id: &str, text: &str, reply_markup: Option<serde_json::Value>) {
        if self.settings.bot_token.is_empty() {
            log::debug!("No bot token configured, dropping message to {chat_id}");
            return;
        }

        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = reply_markup {
            payload["reply_markup"] = markup;
        }

        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.settings.bot_token
        );

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                log::warn!(
                    "Telegram rejected message to {chat_id}: {}",
                    response.status()
                );
            }
            Err(e) => {
                log::warn!("Could not deliver message to {chat_id}: {e}");
            }
        }
    }

    async fn welcome(&self, chat_id: &str, username: &str) {
        let text = format!(
            "Hello, @{username}! Welcome aboard. \u{1F44B}\n\n\
             Spin the wheel, finish quests and climb the leaderboard.\n\n\
             Tap 'START' to open the app and register automatically."
        );
        let markup = json!({
            "inline_keyboard": [[{
                "text": "START",
                "web_app": { "url": format!("{}?user={}", self.settings.webapp_url, username) }
            }]]
        });

        self.send_message(chat_id, &text, Some(markup)).await;
    }

    async fn referral_credited(
        &self,
        chat_id: &str,
        referee: &str,
        bonus_spins: i64,
        bonus_points: i64,
    ) {
        let text = format!(
            "Congratulations! You received {bonus_spins} free spins and \
             {bonus_points} points for referring new user @{referee}"
        );
        self.send_message(chat_id, &text, None).await;
    }
}

#[async_trait]
impl RequestHandler<TelegramRequest> for TelegramRequestHandler {
    async fn handle_request(&self, request: TelegramRequest) {
        match request {
            TelegramRequest::Welcome { chat_id, username } => {
                self.welcome(&chat_id, &username).await;
            }
            TelegramRequest::ReferralCredited {
                chat_id,
                referee,
                bonus_spins,
                bonus_points,
            } => {
                self.referral_credited(&chat_id, &referee, bonus_spins, bonus_points)
                    .await;
            }
        }
    }
}

pub struct TelegramService;

impl TelegramService {
    pub fn new() -> Self {
        TelegramService {}
    }
}

#[async_trait]
impl Service<TelegramRequest, TelegramRequestHandler> for TelegramService {}
