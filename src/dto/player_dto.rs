use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Player {
    pub id: String,
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
    pub dynasty_value: Option<i64>,
    pub dynasty_rank: Option<i64>,
    pub position_rank: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }

    /// The stored valuation, if this player has one with a skill position.
    pub fn valuation(&self) -> Option<PlayerValuation> {
        let value = self.dynasty_value.filter(|&v| v > 0)?;
        let position = Position::parse(self.position.as_deref()?)?;
        Some(PlayerValuation {
            name: self.full_name(),
            position,
            team: self.team.clone().unwrap_or_default(),
            value,
        })
    }
}

/// Skill positions that carry dynasty values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
}

impl Position {
    pub const ALL: [Position; 4] = [Position::QB, Position::RB, Position::WR, Position::TE];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
        }
    }

    /// Exact, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::QB),
            "RB" => Some(Position::RB),
            "WR" => Some(Position::WR),
            "TE" => Some(Position::TE),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerValuation {
    pub name: String,
    pub position: Position,
    pub team: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantinedRecord {
    pub index: usize,
    pub record: Value,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Ingestion {
    pub accepted: Vec<PlayerValuation>,
    pub quarantined: Vec<QuarantinedRecord>,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub accepted: usize,
    pub updated: usize,
    pub quarantined: Vec<QuarantinedRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedValuation {
    pub name: String,
    pub team: String,
    pub position: Position,
    pub value: i64,
    pub rank: Option<i64>,
    pub position_rank: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRankings {
    pub players: Vec<RankedValuation>,
    pub last_updated: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct PlayerValueLookup {
    pub name: String,
    pub value: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayerQuery {
    pub position: Option<String>,
    pub team: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PositionQuery {
    pub position: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    #[serde(default)]
    pub drafted_players: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Recommendations {
    pub recommendations: Vec<Player>,
}
