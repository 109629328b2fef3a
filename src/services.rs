use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};

use crate::settings::Settings;

mod catalog;
mod http;
mod rewards;
mod telegram;
mod users;

#[derive(Debug, thiserror::Error)]
enum ServiceError {
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("User not found")]
    UserNotFound,
    #[error("Quest not found")]
    QuestNotFound,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Insufficient spins")]
    InsufficientSpins,
    #[error("Already claimed")]
    AlreadyClaimed,
    #[error("Invalid timestamp: caller time too far ahead")]
    InvalidTimestamp,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Database error: {0}")]
    Database(String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Per-user mutual exclusion. Every read-modify-write of a user record runs
/// under that user's lock, which makes concurrent spins and claims for the
/// same user linearizable; cross-user operations take no lock.
#[derive(Clone, Default)]
pub struct UserLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, username: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        lock.lock_owned().await
    }
}

pub async fn start_services(pool: PgPool, settings: Settings) -> Result<(), anyhow::Error> {
    let (rewards_tx, mut rewards_rx) = mpsc::channel(512);
    let (user_tx, mut user_rx) = mpsc::channel(512);
    let (catalog_tx, mut catalog_rx) = mpsc::channel(512);
    let (telegram_tx, mut telegram_rx) = mpsc::channel(512);

    let mut rewards_service = rewards::RewardsService::new();
    let mut user_service = users::UserService::new();
    let mut catalog_service = catalog::CatalogService::new();
    let mut telegram_service = telegram::TelegramService::new();

    let locks = UserLocks::new();

    log::info!("Starting Telegram notifier service.");
    let notifier_settings = settings.telegram.clone();
    tokio::spawn(async move {
        telegram_service
            .run(
                telegram::TelegramRequestHandler::new(notifier_settings),
                &mut telegram_rx,
            )
            .await;
    });

    log::info!("Starting rewards service.");
    let rewards_pool = pool.clone();
    let rewards_config = settings.rewards.clone();
    let rewards_locks = locks.clone();
    tokio::spawn(async move {
        rewards_service
            .run(
                rewards::RewardsRequestHandler::new(rewards_pool, rewards_config, rewards_locks),
                &mut rewards_rx,
            )
            .await;
    });

    log::info!("Starting user service.");
    let user_pool = pool.clone();
    let user_config = settings.rewards.clone();
    let user_locks = locks.clone();
    let user_notifier = telegram_tx.clone();
    let admin_password = settings.admin.password.clone();
    tokio::spawn(async move {
        user_service
            .run(
                users::UserRequestHandler::new(
                    user_pool,
                    user_config,
                    admin_password,
                    user_locks,
                    user_notifier,
                ),
                &mut user_rx,
            )
            .await;
    });

    log::info!("Starting catalog quest service.");
    let catalog_pool = pool.clone();
    let catalog_config = settings.rewards.clone();
    let catalog_locks = locks.clone();
    tokio::spawn(async move {
        catalog_service
            .run(
                catalog::CatalogRequestHandler::new(catalog_pool, catalog_config, catalog_locks),
                &mut catalog_rx,
            )
            .await;
    });

    log::info!("Starting HTTP server.");
    http::start_http_server(&settings.server.listen, user_tx, rewards_tx, catalog_tx).await
}
