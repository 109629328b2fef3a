use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::users::{QuestSlot, QuestSlots, SpinState, User};

/// Flat database row; nested spin/quest state is folded out into columns.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    username: String,
    chat_id: String,
    referred_by: Option<String>,
    points: i64,
    redemption_token: Option<String>,
    spin_count: i64,
    spin_unlock_ms: i64,
    spin_last_update: DateTime<Utc>,
    join_completed: bool,
    join_day: DateTime<Utc>,
    follow_completed: bool,
    follow_day: DateTime<Utc>,
    post_completed: bool,
    post_day: DateTime<Utc>,
    checkin_completed: bool,
    checkin_day: DateTime<Utc>,
    refer_completed: bool,
    refer_day: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            username: row.username,
            chat_id: row.chat_id,
            referred_by: row.referred_by,
            points: row.points,
            redemption_token: row.redemption_token,
            spin: SpinState {
                count: row.spin_count,
                unlock_ms: row.spin_unlock_ms,
                last_update: row.spin_last_update,
            },
            quests: QuestSlots {
                join_channel: QuestSlot {
                    completed: row.join_completed,
                    completed_day: row.join_day,
                },
                follow_social: QuestSlot {
                    completed: row.follow_completed,
                    completed_day: row.follow_day,
                },
                post_social: QuestSlot {
                    completed: row.post_completed,
                    completed_day: row.post_day,
                },
                daily_check_in: QuestSlot {
                    completed: row.checkin_completed,
                    completed_day: row.checkin_day,
                },
                refer_friend: QuestSlot {
                    completed: row.refer_completed,
                    completed_day: row.refer_day,
                },
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct UserRepository {
    conn: PgPool,
}

impl UserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, anyhow::Error> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.conn)
            .await?;

        Ok(row.map(User::from))
    }

    pub async fn insert(
        &self,
        username: &str,
        chat_id: &str,
        referred_by: Option<&str>,
        initial_spin_count: i64,
        spin_unlock_ms: i64,
        now: DateTime<Utc>,
    ) -> Result<User, anyhow::Error> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users
                (username, chat_id, referred_by,
                 spin_count, spin_unlock_ms, spin_last_update,
                 join_day, follow_day, post_day, checkin_day, refer_day)
            VALUES ($1, $2, $3, $4, $5, $6, $6, $6, $6, $6, $6)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(chat_id)
        .bind(referred_by)
        .bind(initial_spin_count)
        .bind(spin_unlock_ms)
        .bind(now)
        .fetch_one(&self.conn)
        .await?;

        Ok(row.into())
    }

    /// Persist every mutable field in one statement, so a reward mutation
    /// is never observable half-applied.
    pub async fn save(&self, user: &User) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            UPDATE users SET
                points = $2,
                redemption_token = $3,
                spin_count = $4,
                spin_unlock_ms = $5,
                spin_last_update = $6,
                join_completed = $7, join_day = $8,
                follow_completed = $9, follow_day = $10,
                post_completed = $11, post_day = $12,
                checkin_completed = $13, checkin_day = $14,
                refer_completed = $15, refer_day = $16,
                updated_at = CURRENT_TIMESTAMP
            WHERE username = $1
            "#,
        )
        .bind(&user.username)
        .bind(user.points)
        .bind(&user.redemption_token)
        .bind(user.spin.count)
        .bind(user.spin.unlock_ms)
        .bind(user.spin.last_update)
        .bind(user.quests.join_channel.completed)
        .bind(user.quests.join_channel.completed_day)
        .bind(user.quests.follow_social.completed)
        .bind(user.quests.follow_social.completed_day)
        .bind(user.quests.post_social.completed)
        .bind(user.quests.post_social.completed_day)
        .bind(user.quests.daily_check_in.completed)
        .bind(user.quests.daily_check_in.completed_day)
        .bind(user.quests.refer_friend.completed)
        .bind(user.quests.refer_friend.completed_day)
        .execute(&self.conn)
        .await?;

        Ok(())
    }

    pub async fn top_by_points(&self, limit: i64) -> Result<Vec<User>, anyhow::Error> {
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT * FROM users ORDER BY points DESC LIMIT $1")
                .bind(limit)
                .fetch_all(&self.conn)
                .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn set_redemption_token(
        &self,
        username: &str,
        token: &str,
    ) -> Result<(), anyhow::Error> {
        sqlx::query(
            "UPDATE users SET redemption_token = $2, updated_at = CURRENT_TIMESTAMP WHERE username = $1",
        )
        .bind(username)
        .bind(token)
        .execute(&self.conn)
        .await?;

        Ok(())
    }
}
