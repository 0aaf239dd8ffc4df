use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::ConfigurationError;

/// Identifier of a roster that owns a draft slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterId(pub String);

impl fmt::Display for RosterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RosterId {
    fn from(value: &str) -> Self {
        RosterId(value.to_string())
    }
}

impl From<String> for RosterId {
    fn from(value: String) -> Self {
        RosterId(value)
    }
}

impl From<i64> for RosterId {
    fn from(value: i64) -> Self {
        RosterId(value.to_string())
    }
}

/// Immutable settings of one draft instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftConfiguration {
    pub season: String,
    pub total_rounds: u32,
    pub total_teams: u32,
    /// Roster -> original slot position. Empty while the platform has not set an order.
    pub slot_assignment: BTreeMap<RosterId, u32>,
    pub draft_type: String,
}

impl DraftConfiguration {
    pub fn total_picks(&self) -> u32 {
        self.total_rounds * self.total_teams
    }

    /// Checks the slot assignment is a bijection onto `1..=total_teams`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.total_rounds == 0 {
            return Err(ConfigurationError::NoRounds);
        }
        if self.total_teams == 0 {
            return Err(ConfigurationError::NoTeams);
        }
        if self.slot_assignment.is_empty() {
            return Ok(());
        }
        if self.slot_assignment.len() != self.total_teams as usize {
            return Err(ConfigurationError::SlotCountMismatch {
                assigned: self.slot_assignment.len(),
                teams: self.total_teams,
            });
        }

        let mut seen = HashSet::with_capacity(self.slot_assignment.len());
        for (roster, &slot) in &self.slot_assignment {
            if slot == 0 || slot > self.total_teams {
                return Err(ConfigurationError::SlotOutOfRange {
                    roster: roster.clone(),
                    slot,
                    teams: self.total_teams,
                });
            }
            if !seen.insert(slot) {
                return Err(ConfigurationError::DuplicateSlot { slot });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPick {
    pub overall_pick_number: u32,
    /// `None` when the platform reports the pick slot without a player.
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickOwnershipTrade {
    pub season: String,
    pub round: u32,
    pub previous_owner: RosterId,
    pub new_owner: RosterId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPick {
    pub round: u32,
    pub pick_in_round: u32,
    #[serde(rename = "absolutePick")]
    pub absolute_pick_number: u32,
    pub total_picks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPick {
    pub round: u32,
    pub pick_in_round: u32,
    #[serde(rename = "absolutePick")]
    pub absolute_pick_number: u32,
    pub is_next: bool,
    pub picks_away: u32,
    pub is_traded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickResolution {
    pub current_pick: CurrentPick,
    pub owned_picks: Vec<ResolvedPick>,
    pub traded_picks_count: usize,
}

impl PickResolution {
    pub fn is_draft_complete(&self) -> bool {
        self.current_pick.absolute_pick_number > self.current_pick.total_picks
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrderQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DraftSettingsSummary {
    pub rounds: u32,
    pub teams: u32,
    pub r#type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrderResponse {
    pub current_pick: CurrentPick,
    pub user_picks: Vec<ResolvedPick>,
    pub draft_order: BTreeMap<RosterId, u32>,
    pub traded_picks_count: usize,
    pub settings: DraftSettingsSummary,
}

impl DraftOrderResponse {
    pub fn new(config: DraftConfiguration, resolution: PickResolution) -> Self {
        Self {
            current_pick: resolution.current_pick,
            user_picks: resolution.owned_picks,
            traded_picks_count: resolution.traded_picks_count,
            settings: DraftSettingsSummary {
                rounds: config.total_rounds,
                teams: config.total_teams,
                r#type: config.draft_type,
            },
            draft_order: config.slot_assignment,
        }
    }
}
