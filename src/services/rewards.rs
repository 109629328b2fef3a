use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError, UserLocks};
use crate::engine::{questlog, wheel};
use crate::models::prizes::PrizeDraw;
use crate::models::users::{QuestSlots, SlotClaim, SlotKind, SpinState, User};
use crate::repositories::users::UserRepository;
use crate::settings::Rewards;

pub enum RewardsRequest {
    /// Lazy-settles accrual as a side effect.
    SpinStatus {
        username: String,
        response: oneshot::Sender<Result<SpinState, ServiceError>>,
    },
    Spin {
        username: String,
        response: oneshot::Sender<Result<PrizeDraw, ServiceError>>,
    },
    /// Applies the daily reset transition as a side effect.
    QuestStatus {
        username: String,
        user_time_ms: i64,
        response: oneshot::Sender<Result<QuestSlots, ServiceError>>,
    },
    /// Resolves to the points awarded.
    ClaimSlot {
        username: String,
        slot: SlotKind,
        user_time_ms: i64,
        response: oneshot::Sender<Result<i64, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct RewardsRequestHandler {
    repository: UserRepository,
    config: Rewards,
    locks: UserLocks,
}

impl RewardsRequestHandler {
    pub fn new(sql_conn: PgPool, config: Rewards, locks: UserLocks) -> Self {
        let repository = UserRepository::new(sql_conn);

        RewardsRequestHandler {
            repository,
            config,
            locks,
        }
    }

    async fn load_user(&self, username: &str) -> Result<User, ServiceError> {
        self.repository
            .find_by_username(username)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or(ServiceError::UserNotFound)
    }

    async fn save_user(&self, user: &User) -> Result<(), ServiceError> {
        self.repository
            .save(user)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    /// Caller-supplied wall clock, bounded on the future side only.
    fn caller_time(&self, user_time_ms: i64) -> Result<DateTime<Utc>, ServiceError> {
        let caller = DateTime::<Utc>::from_timestamp_millis(user_time_ms)
            .ok_or_else(|| ServiceError::InvalidRequest("unreadable timestamp".to_string()))?;

        if questlog::exceeds_future_skew(caller, Utc::now(), self.config.max_future_skew_ms) {
            return Err(ServiceError::InvalidTimestamp);
        }
        Ok(caller)
    }

    fn slot_points(&self, kind: SlotKind) -> i64 {
        match kind {
            SlotKind::JoinChannel => self.config.join_channel_points,
            SlotKind::FollowSocial => self.config.follow_social_points,
            SlotKind::PostSocial => self.config.post_social_points,
            SlotKind::DailyCheckIn => self.config.daily_check_in_points,
            SlotKind::ReferFriend => self.config.refer_friend_points,
        }
    }

    async fn spin_status(&self, username: &str) -> Result<SpinState, ServiceError> {
        let _guard = self.locks.acquire(username).await;

        let mut user = self.load_user(username).await?;
        if user.spin.settle(Utc::now()) {
            self.save_user(&user).await?;
        }

        Ok(user.spin)
    }

    async fn spin(&self, username: &str) -> Result<PrizeDraw, ServiceError> {
        let _guard = self.locks.acquire(username).await;

        let mut user = self.load_user(username).await?;
        user.spin.settle(Utc::now());

        if !user.spin.consume() {
            return Err(ServiceError::InsufficientSpins);
        }

        let draw = {
            let mut rng = rand::thread_rng();
            wheel::draw(&self.config.prizes, &mut rng)
        }
        .ok_or_else(|| ServiceError::Internal("prize table is empty".to_string()))?;

        user.points += draw.amount;
        self.save_user(&user).await?;

        Ok(draw)
    }

    async fn quest_status(
        &self,
        username: &str,
        user_time_ms: i64,
    ) -> Result<QuestSlots, ServiceError> {
        let _guard = self.locks.acquire(username).await;

        let mut user = self.load_user(username).await?;
        let caller_time = self.caller_time(user_time_ms)?;
        if user.quests.reset_expired(caller_time) {
            self.save_user(&user).await?;
        }

        Ok(user.quests)
    }

    async fn claim_slot(
        &self,
        username: &str,
        slot: SlotKind,
        user_time_ms: i64,
    ) -> Result<i64, ServiceError> {
        let _guard = self.locks.acquire(username).await;

        let mut user = self.load_user(username).await?;
        let caller_time = self.caller_time(user_time_ms)?;
        let reset = user.quests.reset_expired(caller_time);

        match user.quests.claim(slot, caller_time) {
            SlotClaim::AlreadyClaimed => {
                // a reset of another slot still has to stick
                if reset {
                    self.save_user(&user).await?;
                }
                Err(ServiceError::AlreadyClaimed)
            }
            SlotClaim::Claimed => {
                let points = self.slot_points(slot);
                user.points += points;
                self.save_user(&user).await?;
                Ok(points)
            }
        }
    }
}

#[async_trait]
impl RequestHandler<RewardsRequest> for RewardsRequestHandler {
    async fn handle_request(&self, request: RewardsRequest) {
        match request {
            RewardsRequest::SpinStatus { username, response } => {
                let result = self.spin_status(&username).await;
                let _ = response.send(result);
            }
            RewardsRequest::Spin { username, response } => {
                let result = self.spin(&username).await;
                let _ = response.send(result);
            }
            RewardsRequest::QuestStatus {
                username,
                user_time_ms,
                response,
            } => {
                let result = self.quest_status(&username, user_time_ms).await;
                let _ = response.send(result);
            }
            RewardsRequest::ClaimSlot {
                username,
                slot,
                user_time_ms,
                response,
            } => {
                let result = self.claim_slot(&username, slot, user_time_ms).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct RewardsService;

impl RewardsService {
    pub fn new() -> Self {
        RewardsService {}
    }
}

#[async_trait]
impl Service<RewardsRequest, RewardsRequestHandler> for RewardsService {}
