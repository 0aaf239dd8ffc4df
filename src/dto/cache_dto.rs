use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKey {
    SleeperPlayers,
    DynastyValues,
}

impl CacheKey {
    pub const ALL: [CacheKey; 2] = [CacheKey::SleeperPlayers, CacheKey::DynastyValues];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::SleeperPlayers => "sleeper_players",
            CacheKey::DynastyValues => "dynasty_values",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Active,
    Updating,
    Failed,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Active => "active",
            CacheStatus::Updating => "updating",
            CacheStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CacheEntry {
    pub id: i64,
    pub cache_key: String,
    pub last_updated: DateTime<Utc>,
    pub data_count: i64,
    pub status: String,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub sleeper: RefreshOutcome,
    pub values: RefreshOutcome,
}

#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub caches: Vec<CacheEntry>,
    pub total_players: i64,
    pub timestamp: DateTime<Utc>,
}
