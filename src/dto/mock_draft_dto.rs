use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::dto::sleeper_dto::{DEFAULT_ROUNDS, DEFAULT_TEAMS};

/// Upper bound on rounds and on teams of a mock draft.
pub const MAX_MOCK_DIMENSION: i64 = 1_000;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct MockDraft {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub league_settings: Json<Value>,
    pub draft_order: Json<Value>,
    pub picks: Json<Value>,
    pub current_pick: i64,
    pub is_completed: bool,
    pub total_rounds: i64,
    pub total_teams: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMockDraft {
    pub id: Option<String>,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub league_settings: Value,
    #[serde(default)]
    pub draft_order: Value,
    #[serde(default)]
    pub picks: Value,
    pub current_pick: Option<i64>,
    pub is_completed: Option<bool>,
    pub total_rounds: Option<i64>,
    pub total_teams: Option<i64>,
    pub notes: Option<String>,
}

impl CreateMockDraft {
    pub fn total_rounds(&self) -> i64 {
        self.total_rounds.unwrap_or(DEFAULT_ROUNDS as i64)
    }

    pub fn total_teams(&self) -> i64 {
        self.total_teams.unwrap_or(DEFAULT_TEAMS as i64)
    }
}

/// `Some(None)` for an explicit `null`, `None` when the field is absent.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update; absent fields keep their stored value, a `null` note clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMockDraft {
    pub name: Option<String>,
    pub league_settings: Option<Value>,
    pub draft_order: Option<Value>,
    pub picks: Option<Value>,
    pub current_pick: Option<i64>,
    pub is_completed: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct MockDraftPick {
    pub id: i64,
    pub mock_draft_id: String,
    pub round: i64,
    pub pick: i64,
    pub round_pick: i64,
    pub team_id: String,
    pub player_id: Option<String>,
    pub player_name: Option<String>,
    pub player_position: Option<String>,
    pub player_team: Option<String>,
    pub picked_at: DateTime<Utc>,
    pub is_user_pick: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateMockDraftPick {
    pub round: i64,
    pub pick: i64,
    pub round_pick: i64,
    pub team_id: String,
    pub player_id: Option<String>,
    pub player_name: Option<String>,
    pub player_position: Option<String>,
    pub player_team: Option<String>,
    #[serde(default)]
    pub is_user_pick: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlotQuery {
    pub round: Option<i64>,
    pub pick: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockDraftUpdate<'a> {
    pub r#type: &'static str,
    pub mock_draft_id: &'a str,
    pub pick: &'a MockDraftPick,
}
