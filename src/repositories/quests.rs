use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::quests::{Quest, QuestClaim};

#[derive(Debug, sqlx::FromRow)]
struct QuestRow {
    id: Uuid,
    quest_type: String,
    title: String,
    description: String,
    link: Option<String>,
    points: i64,
    daily: bool,
}

impl From<QuestRow> for Quest {
    fn from(row: QuestRow) -> Self {
        Quest {
            id: row.id,
            quest_type: row.quest_type,
            title: row.title,
            description: row.description,
            link: row.link,
            points: row.points,
            daily: row.daily,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ClaimRow {
    quest_id: Uuid,
    username: String,
    claimed_at: DateTime<Utc>,
}

impl From<ClaimRow> for QuestClaim {
    fn from(row: ClaimRow) -> Self {
        QuestClaim {
            quest_id: row.quest_id,
            username: row.username,
            claimed_at: row.claimed_at,
        }
    }
}

#[derive(Clone)]
pub struct QuestRepository {
    conn: PgPool,
}

impl QuestRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    pub async fn get_quest(&self, id: Uuid) -> Result<Option<Quest>, anyhow::Error> {
        let row: Option<QuestRow> = sqlx::query_as("SELECT * FROM quests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(row.map(Quest::from))
    }

    /// The user's slice of the quest's who-done ledger.
    pub async fn claims_for(
        &self,
        quest_id: Uuid,
        username: &str,
    ) -> Result<Vec<QuestClaim>, anyhow::Error> {
        let rows: Vec<ClaimRow> = sqlx::query_as(
            "SELECT quest_id, username, claimed_at FROM quest_claims WHERE quest_id = $1 AND username = $2",
        )
        .bind(quest_id)
        .bind(username)
        .fetch_all(&self.conn)
        .await?;

        Ok(rows.into_iter().map(QuestClaim::from).collect())
    }

    /// Append to the ledger; claims are never updated or removed.
    pub async fn insert_claim(
        &self,
        quest_id: Uuid,
        username: &str,
        claimed_at: DateTime<Utc>,
    ) -> Result<(), anyhow::Error> {
        sqlx::query("INSERT INTO quest_claims (quest_id, username, claimed_at) VALUES ($1, $2, $3)")
            .bind(quest_id)
            .bind(username)
            .bind(claimed_at)
            .execute(&self.conn)
            .await?;

        Ok(())
    }
}
