use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::dto::player_dto::{Ingestion, PlayerValuation, Position, QuarantinedRecord};

pub const MAX_VALUE: i64 = 10_000;

/// Round labels that mark a ranked draft-pick asset rather than a player.
const PICK_LABELS: [&str; 7] = ["1st", "2nd", "3rd", "4th", "Early", "Mid", "Late"];

/// Ignored when comparing names loosely.
const NAME_SUFFIXES: [&str; 7] = ["jr", "jr.", "sr", "sr.", "ii", "iii", "iv"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("record is not a valuation object")]
    Malformed,

    #[error("player name is missing")]
    MissingName,

    #[error("record is a draft pick, not a player")]
    DraftPickAsset,

    #[error("unsupported position `{0}`")]
    UnsupportedPosition(String),

    #[error("team is missing or invalid")]
    MissingTeam,

    #[error("value `{0}` is not a positive integer")]
    InvalidValue(String),
}

#[derive(Debug, Error)]
pub enum ValuationSourceError {
    #[error("failed to read valuations from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse valuations in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{path} must contain a JSON array of valuation records")]
    NotArray { path: PathBuf },
}

/// Both shapes the curated sources use.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValuation {
    Split {
        #[serde(alias = "firstName")]
        first_name: String,
        #[serde(alias = "lastName")]
        last_name: String,
        #[serde(default)]
        position: Option<String>,
        #[serde(default)]
        team: Option<String>,
        value: Value,
    },
    Full {
        name: String,
        #[serde(default)]
        position: Option<String>,
        #[serde(default)]
        team: Option<String>,
        value: Value,
    },
}

pub fn ingest(records: &[Value]) -> Ingestion {
    let mut ingestion = Ingestion::default();
    for (index, record) in records.iter().enumerate() {
        match validate(record) {
            Ok(valuation) => ingestion.accepted.push(valuation),
            Err(reason) => ingestion.quarantined.push(QuarantinedRecord {
                index,
                record: record.clone(),
                reason: reason.to_string(),
            }),
        }
    }
    ingestion
}

pub fn validate(record: &Value) -> Result<PlayerValuation, RejectReason> {
    let raw = RawValuation::deserialize(record).map_err(|_| RejectReason::Malformed)?;
    let (name, position, team, value) = match raw {
        RawValuation::Split {
            first_name,
            last_name,
            position,
            team,
            value,
        } => (format!("{} {}", first_name.trim(), last_name.trim()), position, team, value),
        RawValuation::Full {
            name,
            position,
            team,
            value,
        } => (name, position, team, value),
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(RejectReason::MissingName);
    }

    let (name, team) = match team.filter(|t| !t.trim().is_empty()) {
        Some(team) => (name.to_string(), Some(team)),
        None => split_trailing_team(name),
    };

    if name.split_whitespace().any(|part| PICK_LABELS.contains(&part)) {
        return Err(RejectReason::DraftPickAsset);
    }

    let position = normalize_position(position.as_deref().unwrap_or_default())?;
    let team = normalize_team(team.as_deref()).ok_or(RejectReason::MissingTeam)?;
    let value = parse_value(&value)?;

    Ok(PlayerValuation {
        name,
        position,
        team,
        value,
    })
}

/// Splits `"Michael Penix Jr.ATL"` into the name and team code.
fn split_trailing_team(name: &str) -> (String, Option<String>) {
    let run = name
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_uppercase())
        .count();
    let head = &name[..name.len() - run];

    match head.chars().last() {
        Some(prev) if (2..=4).contains(&run) && !prev.is_whitespace() && !prev.is_ascii_uppercase() => {
            (head.trim().to_string(), Some(name[head.len()..].to_string()))
        }
        _ => (name.to_string(), None),
    }
}

/// Keeps the leading position code of labels like `"WR1 24.3 y.o."`.
fn normalize_position(raw: &str) -> Result<Position, RejectReason> {
    let upper = raw.trim().to_uppercase();
    if upper.starts_with("PICK") {
        return Err(RejectReason::DraftPickAsset);
    }
    Position::ALL
        .into_iter()
        .find(|p| upper.starts_with(p.as_str()))
        .ok_or(RejectReason::UnsupportedPosition(raw.trim().to_string()))
}

fn normalize_team(raw: Option<&str>) -> Option<String> {
    let team = raw?.trim().to_uppercase();
    let valid = (2..=4).contains(&team.len()) && team.chars().all(|c| c.is_ascii_alphabetic());
    valid.then_some(team)
}

fn parse_value(raw: &Value) -> Result<i64, RejectReason> {
    let parsed = match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let digits: String = s.chars().filter(char::is_ascii_digit).collect();
            digits.parse::<i64>().ok()
        }
        _ => None,
    };

    match parsed {
        Some(v) if v > 0 => Ok(v.min(MAX_VALUE)),
        _ => Err(RejectReason::InvalidValue(raw.to_string())),
    }
}

pub fn load_records(path: &Path) -> Result<Vec<Value>, ValuationSourceError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ValuationSourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: Value = serde_json::from_str(&contents).map_err(|source| ValuationSourceError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match parsed {
        Value::Array(records) => Ok(records),
        _ => Err(ValuationSourceError::NotArray {
            path: path.to_path_buf(),
        }),
    }
}

fn name_parts(name: &str) -> Vec<String> {
    name.split_whitespace()
        .map(str::to_lowercase)
        .filter(|part| !NAME_SUFFIXES.contains(&part.as_str()))
        .collect()
}

/// First and last name parts contain one another in either direction.
fn loosely_matches(candidate: &[String], query: &[String]) -> bool {
    if candidate.len() < 2 || query.len() < 2 {
        return false;
    }
    let contains = |a: &str, b: &str| a.contains(b) || b.contains(a);
    contains(&candidate[0], &query[0])
        && contains(&candidate[candidate.len() - 1], &query[query.len() - 1])
}

fn position_matches(valuation: &PlayerValuation, position: Option<&str>) -> bool {
    position.is_none_or(|p| valuation.position.as_str().eq_ignore_ascii_case(p.trim()))
}

/// Value for a player name: exact match first, then a loose first/last match.
pub fn find_value(valuations: &[PlayerValuation], name: &str, position: Option<&str>) -> Option<i64> {
    let wanted = name.trim().to_lowercase();
    let query = name_parts(name);

    valuations
        .iter()
        .find(|v| v.name.to_lowercase() == wanted && position_matches(v, position))
        .or_else(|| {
            valuations
                .iter()
                .find(|v| position_matches(v, position) && loosely_matches(&name_parts(&v.name), &query))
        })
        .map(|v| v.value)
}

pub fn search<'a>(valuations: &'a [PlayerValuation], query: &str) -> Vec<&'a PlayerValuation> {
    let q = query.trim().to_lowercase();
    valuations
        .iter()
        .filter(|v| {
            v.name.to_lowercase().contains(&q)
                || v.team.to_lowercase().contains(&q)
                || v.position.as_str().to_lowercase().contains(&q)
        })
        .collect()
}

#[derive(sqlx::FromRow)]
struct PlayerName {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    position: Option<String>,
}

impl PlayerName {
    fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_lowercase()
    }
}

/// Writes values and ranks onto stored players. Returns the number of player rows updated.
pub async fn apply_valuations(pool: &SqlitePool, valuations: &[PlayerValuation]) -> Result<usize, sqlx::Error> {
    let players = sqlx::query_as::<_, PlayerName>(
        "SELECT id, first_name, last_name, position FROM players",
    )
    .fetch_all(pool)
    .await?;

    let mut ranked: Vec<&PlayerValuation> = valuations.iter().collect();
    ranked.sort_by(|a, b| b.value.cmp(&a.value));

    let mut position_counts: HashMap<Position, i64> = HashMap::new();
    let mut updated = 0;
    let now = Utc::now();

    for (index, valuation) in ranked.into_iter().enumerate() {
        let position_rank = {
            let count = position_counts.entry(valuation.position).or_insert(0);
            *count += 1;
            *count
        };

        let same_position: Vec<&PlayerName> = players
            .iter()
            .filter(|p| p.position.as_deref() == Some(valuation.position.as_str()))
            .collect();
        let wanted = valuation.name.to_lowercase();
        let mut matched: Vec<&PlayerName> = same_position
            .iter()
            .copied()
            .filter(|p| p.full_name() == wanted)
            .collect();
        if matched.is_empty() {
            let query = name_parts(&valuation.name);
            matched = same_position
                .iter()
                .copied()
                .filter(|p| loosely_matches(&name_parts(&p.full_name()), &query))
                .collect();
        }

        if matched.is_empty() {
            warn!("No player match for {} ({})", valuation.name, valuation.position);
            continue;
        }

        for player in matched {
            sqlx::query(
                r#"
                UPDATE players
                SET dynasty_value = ?, dynasty_rank = ?, position_rank = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(valuation.value)
            .bind(index as i64 + 1)
            .bind(position_rank)
            .bind(now)
            .bind(&player.id)
            .execute(pool)
            .await?;
            updated += 1;
        }
    }

    info!("Applied {} valuations to {} players", valuations.len(), updated);
    Ok(updated)
}
