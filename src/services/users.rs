use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::{mpsc, oneshot};

use super::telegram::TelegramRequest;
use super::{RequestHandler, Service, ServiceError, UserLocks};
use crate::models::users::{SlotKind, User, UserSnapshot};
use crate::repositories::users::UserRepository;
use crate::settings::Rewards;
use crate::utils;

const LEADERBOARD_MAX: i64 = 100;
const REDEMPTION_TOKEN_LEN: usize = 8;

pub enum UserRequest {
    /// First-contact registration; re-registration is a no-op apart from
    /// the welcome message.
    Register {
        username: String,
        chat_id: String,
        referrer: Option<String>,
        response: oneshot::Sender<Result<Registration, ServiceError>>,
    },
    GetUser {
        username: String,
        response: oneshot::Sender<Result<User, ServiceError>>,
    },
    Leaderboard {
        limit: i64,
        response: oneshot::Sender<Result<Vec<UserSnapshot>, ServiceError>>,
    },
    /// Snapshots the top of the leaderboard and hands out redemption tokens.
    EndEvent {
        password: String,
        response: oneshot::Sender<Result<u64, ServiceError>>,
    },
}

pub struct Registration {
    pub user: User,
    pub created: bool,
    pub referral_credited: bool,
}

#[derive(Clone)]
pub struct UserRequestHandler {
    repository: UserRepository,
    config: Rewards,
    admin_password: String,
    locks: UserLocks,
    notifier: mpsc::Sender<TelegramRequest>,
}

impl UserRequestHandler {
    pub fn new(
        sql_conn: PgPool,
        config: Rewards,
        admin_password: String,
        locks: UserLocks,
        notifier: mpsc::Sender<TelegramRequest>,
    ) -> Self {
        let repository = UserRepository::new(sql_conn);

        UserRequestHandler {
            repository,
            config,
            admin_password,
            locks,
            notifier,
        }
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, ServiceError> {
        self.repository
            .find_by_username(username)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn register(
        &self,
        username: &str,
        chat_id: &str,
        referrer: Option<String>,
    ) -> Result<Registration, ServiceError> {
        let referrer = sanitize_referrer(username, referrer);

        let user = {
            let _guard = self.locks.acquire(username).await;

            if let Some(existing) = self.find_user(username).await? {
                // the immutable referrer reference was fixed at creation;
                // nothing to credit again
                self.send_welcome(&existing).await;
                return Ok(Registration {
                    user: existing,
                    created: false,
                    referral_credited: false,
                });
            }

            self.repository
                .insert(
                    username,
                    chat_id,
                    referrer.as_deref(),
                    self.config.initial_spin_count,
                    self.config.spin_unlock_ms,
                    Utc::now(),
                )
                .await
                .map_err(|e| ServiceError::Database(e.to_string()))?
        };

        // the referee guard is released before the referrer's is taken, so
        // only one user lock is ever held at a time
        let mut referral_credited = false;
        if let Some(tag) = referrer {
            referral_credited = self.credit_referrer(&tag, username).await?;
        }

        self.send_welcome(&user).await;

        Ok(Registration {
            user,
            created: true,
            referral_credited,
        })
    }

    /// Pay the referral bonus to an existing referrer. The credit commits
    /// before the notification attempt; a lost message never unwinds it.
    async fn credit_referrer(&self, referrer: &str, referee: &str) -> Result<bool, ServiceError> {
        let _guard = self.locks.acquire(referrer).await;

        let Some(mut sender) = self.find_user(referrer).await? else {
            log::info!("Referral from {referee} names unknown referrer {referrer}, skipping");
            return Ok(false);
        };

        sender.spin.count += self.config.referral_bonus_spins;
        sender.points += self.config.referral_bonus_points;
        if !sender.quests.refer_friend.completed {
            sender.quests.claim(SlotKind::ReferFriend, Utc::now());
        }

        self.repository
            .save(&sender)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        let notify = self
            .notifier
            .send(TelegramRequest::ReferralCredited {
                chat_id: sender.chat_id.clone(),
                referee: referee.to_string(),
                bonus_spins: self.config.referral_bonus_spins,
                bonus_points: self.config.referral_bonus_points,
            })
            .await;
        if let Err(e) = notify {
            log::warn!("Could not queue referral notification for {referrer}: {e}");
        }

        Ok(true)
    }

    async fn send_welcome(&self, user: &User) {
        let result = self
            .notifier
            .send(TelegramRequest::Welcome {
                chat_id: user.chat_id.clone(),
                username: user.username.clone(),
            })
            .await;
        if let Err(e) = result {
            log::warn!("Could not queue welcome message for {}: {e}", user.username);
        }
    }

    async fn get_user(&self, username: &str) -> Result<User, ServiceError> {
        self.find_user(username)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<UserSnapshot>, ServiceError> {
        let limit = limit.clamp(1, LEADERBOARD_MAX);
        let users = self
            .repository
            .top_by_points(limit)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        Ok(users.iter().map(UserSnapshot::from).collect())
    }

    async fn end_event(&self, password: &str) -> Result<u64, ServiceError> {
        if password != self.admin_password {
            return Err(ServiceError::Unauthorized);
        }

        let winners = self
            .repository
            .top_by_points(LEADERBOARD_MAX)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        let mut assigned = 0u64;
        for winner in &winners {
            let token = utils::redemption_token(REDEMPTION_TOKEN_LEN);
            self.repository
                .set_redemption_token(&winner.username, &token)
                .await
                .map_err(|e| ServiceError::Database(e.to_string()))?;
            assigned += 1;
        }

        log::info!("Event ended, {assigned} redemption tokens assigned");
        Ok(assigned)
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::Register {
                username,
                chat_id,
                referrer,
                response,
            } => {
                let result = self.register(&username, &chat_id, referrer).await;
                let _ = response.send(result);
            }
            UserRequest::GetUser { username, response } => {
                let result = self.get_user(&username).await;
                let _ = response.send(result);
            }
            UserRequest::Leaderboard { limit, response } => {
                let result = self.leaderboard(limit).await;
                let _ = response.send(result);
            }
            UserRequest::EndEvent { password, response } => {
                let result = self.end_event(&password).await;
                let _ = response.send(result);
            }
        }
    }
}

/// A referral tag only counts when it names someone other than the new
/// user. The tag is fixed into the record at creation, so re-registration
/// can never re-trigger a credit.
fn sanitize_referrer(username: &str, referrer: Option<String>) -> Option<String> {
    referrer.filter(|tag| !tag.is_empty() && tag != username)
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_referral_is_discarded() {
        assert_eq!(sanitize_referrer("alice", Some("alice".to_string())), None);
        assert_eq!(sanitize_referrer("alice", Some(String::new())), None);
        assert_eq!(
            sanitize_referrer("alice", Some("bob".to_string())),
            Some("bob".to_string())
        );
        assert_eq!(sanitize_referrer("alice", None), None);
    }
}
