use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::dto::sleeper_dto::{SleeperDraft, SleeperLeague, SleeperUser};

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Session {
    pub id: i64,
    pub league_id: String,
    pub draft_id: String,
    pub user_id: String,
    pub league_name: String,
    pub last_used: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct WatchlistEntry {
    pub id: i64,
    pub user_id: String,
    pub player_id: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWatchlistEntry {
    pub user_id: String,
    pub player_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    #[serde(default)]
    pub league_id: String,
    #[serde(default)]
    pub draft_id: String,
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub league: SleeperLeague,
    pub draft: SleeperDraft,
    pub user: SleeperUser,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub success: bool,
}
