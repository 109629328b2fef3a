use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{RequestHandler, Service, ServiceError, UserLocks};
use crate::engine::questlog;
use crate::models::quests::{Quest, QuestStatus};
use crate::repositories::quests::QuestRepository;
use crate::repositories::users::UserRepository;
use crate::settings::Rewards;

pub enum CatalogRequest {
    /// Resolves to the points awarded.
    Complete {
        username: String,
        quest_id: Uuid,
        user_time_ms: i64,
        response: oneshot::Sender<Result<i64, ServiceError>>,
    },
    Status {
        username: String,
        quest_id: Uuid,
        response: oneshot::Sender<Result<QuestStatus, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct CatalogRequestHandler {
    users: UserRepository,
    quests: QuestRepository,
    config: Rewards,
    locks: UserLocks,
}

impl CatalogRequestHandler {
    pub fn new(sql_conn: PgPool, config: Rewards, locks: UserLocks) -> Self {
        let users = UserRepository::new(sql_conn.clone());
        let quests = QuestRepository::new(sql_conn);

        CatalogRequestHandler {
            users,
            quests,
            config,
            locks,
        }
    }

    async fn load_quest(&self, quest_id: Uuid) -> Result<Quest, ServiceError> {
        self.quests
            .get_quest(quest_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or(ServiceError::QuestNotFound)
    }

    /// Whether `username` may still claim `quest` at `at`, by scanning
    /// their slice of the who-done ledger.
    async fn can_claim(
        &self,
        quest: &Quest,
        username: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let claims = self
            .quests
            .claims_for(quest.id, username)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        let times: Vec<DateTime<Utc>> = claims.iter().map(|c| c.claimed_at).collect();
        Ok(questlog::can_claim_catalog(quest.daily, &times, at))
    }

    async fn complete(
        &self,
        username: &str,
        quest_id: Uuid,
        user_time_ms: i64,
    ) -> Result<i64, ServiceError> {
        let _guard = self.locks.acquire(username).await;

        let mut user = self
            .users
            .find_by_username(username)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or(ServiceError::UserNotFound)?;
        let quest = self.load_quest(quest_id).await?;

        let caller_time = DateTime::<Utc>::from_timestamp_millis(user_time_ms)
            .ok_or_else(|| ServiceError::InvalidRequest("unreadable timestamp".to_string()))?;
        if questlog::exceeds_future_skew(caller_time, Utc::now(), self.config.max_future_skew_ms) {
            return Err(ServiceError::InvalidTimestamp);
        }

        if !self.can_claim(&quest, username, caller_time).await? {
            return Err(ServiceError::AlreadyClaimed);
        }

        self.quests
            .insert_claim(quest.id, username, caller_time)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        user.points += quest.points;
        self.users
            .save(&user)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        Ok(quest.points)
    }

    async fn status(&self, username: &str, quest_id: Uuid) -> Result<QuestStatus, ServiceError> {
        let user = self
            .users
            .find_by_username(username)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or(ServiceError::UserNotFound)?;
        let quest = self.load_quest(quest_id).await?;

        let can_claim = self.can_claim(&quest, &user.username, Utc::now()).await?;
        Ok(QuestStatus {
            can_claim,
            is_daily: quest.daily,
        })
    }
}

#[async_trait]
impl RequestHandler<CatalogRequest> for CatalogRequestHandler {
    async fn handle_request(&self, request: CatalogRequest) {
        match request {
            CatalogRequest::Complete {
                username,
                quest_id,
                user_time_ms,
                response,
            } => {
                let result = self.complete(&username, quest_id, user_time_ms).await;
                let _ = response.send(result);
            }
            CatalogRequest::Status {
                username,
                quest_id,
                response,
            } => {
                let result = self.status(&username, quest_id).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct CatalogService;

impl CatalogService {
    pub fn new() -> Self {
        CatalogService {}
    }
}

#[async_trait]
impl Service<CatalogRequest, CatalogRequestHandler> for CatalogService {}
