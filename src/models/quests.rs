use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog quest: dynamically defined, claimable by any user, tracked via
/// an append-only claim ledger rather than a fixed per-user slot.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Quest {
    pub id: Uuid,
    pub quest_type: String,
    pub title: String,
    pub description: String,
    pub link: Option<String>,
    pub points: i64,
    pub daily: bool,
}

/// One row of a quest's `who_done` ledger.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QuestClaim {
    pub quest_id: Uuid,
    pub username: String,
    pub claimed_at: DateTime<Utc>,
}

/// Claimability of a catalog quest for one user.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct QuestStatus {
    pub can_claim: bool,
    pub is_daily: bool,
}
