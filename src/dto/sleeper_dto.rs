use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::dto::draft_dto::{CompletedPick, DraftConfiguration, PickOwnershipTrade, RosterId};

pub const DEFAULT_ROUNDS: u32 = 15;
pub const DEFAULT_TEAMS: u32 = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleeperUser {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleeperLeague {
    pub league_id: String,
    pub name: String,
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub total_rosters: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleeperDraft {
    pub draft_id: String,
    pub league_id: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub start_time: Option<i64>,
    /// Owner id -> original slot.
    #[serde(default)]
    pub draft_order: Option<HashMap<String, u32>>,
    /// Slot (as a string key) -> platform roster id.
    #[serde(default)]
    pub slot_to_roster_id: Option<HashMap<String, Option<i64>>>,
}

impl SleeperDraft {
    fn setting(&self, key: &str) -> Option<u32> {
        self.settings
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|&n| n > 0)
    }

    pub fn configuration(&self) -> DraftConfiguration {
        let slot_assignment: BTreeMap<RosterId, u32> = self
            .draft_order
            .iter()
            .flatten()
            .map(|(owner, &slot)| (RosterId::from(owner.as_str()), slot))
            .collect();

        let total_teams = if slot_assignment.is_empty() {
            self.setting("teams").unwrap_or(DEFAULT_TEAMS)
        } else {
            slot_assignment.len() as u32
        };

        DraftConfiguration {
            season: self.season.clone(),
            total_rounds: self.setting("rounds").unwrap_or(DEFAULT_ROUNDS),
            total_teams,
            slot_assignment,
            draft_type: self.r#type.clone(),
        }
    }

    /// Converts platform trades into the draft-order key space.
    ///
    /// Trades name numeric roster ids while `draft_order` is keyed by owner;
    /// `slot_to_roster_id` bridges the two. Ids without a mapping pass through as-is.
    pub fn ownership_trades(&self, traded: &[SleeperTradedPick]) -> Vec<PickOwnershipTrade> {
        let owner_by_slot: HashMap<u32, &str> = self
            .draft_order
            .iter()
            .flatten()
            .map(|(owner, &slot)| (slot, owner.as_str()))
            .collect();

        let owner_by_roster: HashMap<i64, &str> = self
            .slot_to_roster_id
            .iter()
            .flatten()
            .filter_map(|(slot, roster)| {
                let slot: u32 = slot.parse().ok()?;
                let roster = (*roster)?;
                owner_by_slot.get(&slot).map(|owner| (roster, *owner))
            })
            .collect();

        let translate = |roster: i64| {
            owner_by_roster
                .get(&roster)
                .map_or_else(|| RosterId::from(roster), |owner| RosterId::from(*owner))
        };

        traded
            .iter()
            .map(|t| PickOwnershipTrade {
                season: t.season.clone(),
                round: t.round,
                previous_owner: translate(t.previous_owner_id),
                new_owner: translate(t.owner_id),
            })
            .collect()
    }
}

/// Sleeper sends some numeric ids as strings.
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleeperDraftPick {
    pub draft_id: String,
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub picked_by: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub roster_id: Option<i64>,
    pub round: u32,
    pub pick_no: u32,
    #[serde(default)]
    pub is_keeper: Option<bool>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl SleeperDraftPick {
    pub fn completed(&self) -> CompletedPick {
        CompletedPick {
            overall_pick_number: self.pick_no,
            player_id: self.player_id.clone().filter(|id| !id.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleeperTradedPick {
    pub season: String,
    pub round: u32,
    pub roster_id: i64,
    pub previous_owner_id: i64,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SleeperPlayer {
    pub player_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub team: Option<String>,
    pub age: Option<i64>,
    pub years_exp: Option<i64>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub status: Option<String>,
    pub injury_status: Option<String>,
    pub fantasy_positions: Option<Vec<String>>,
}
