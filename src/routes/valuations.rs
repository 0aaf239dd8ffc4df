use axum::extract::{Extension, Json, Path, Query};
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::dto::player_dto::{
    ImportSummary, Player, PlayerValuation, PlayerValueLookup, PositionQuery, RankedValuation,
    SearchQuery, ValuationRankings,
};
use crate::error::AppError;
use crate::routes::players::valued_players;
use crate::services::valuation;

async fn stored_valuations(pool: &SqlitePool) -> Result<Vec<(Player, PlayerValuation)>, sqlx::Error> {
    Ok(valued_players(pool)
        .await?
        .into_iter()
        .filter_map(|p| p.valuation().map(|v| (p, v)))
        .collect())
}

pub async fn get_valuations(
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<ValuationRankings>, AppError> {
    info!("Fetching valuation rankings.");
    let stored = stored_valuations(&pool).await?;
    let last_updated = stored
        .iter()
        .map(|(p, _)| p.updated_at)
        .max()
        .unwrap_or_else(Utc::now);

    let players = stored
        .into_iter()
        .map(|(p, v)| RankedValuation {
            name: v.name,
            team: v.team,
            position: v.position,
            value: v.value,
            rank: p.dynasty_rank,
            position_rank: p.position_rank,
        })
        .collect();

    Ok(Json(ValuationRankings {
        players,
        last_updated,
        source: "curated_values".to_string(),
    }))
}

pub async fn search_valuations(
    Query(query): Query<SearchQuery>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<Vec<PlayerValuation>>, AppError> {
    let q = query
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Query parameter 'q' is required".to_string()))?;
    info!("Searching valuations for {}.", q);

    let valuations: Vec<PlayerValuation> = stored_valuations(&pool).await?.into_iter().map(|(_, v)| v).collect();
    Ok(Json(valuation::search(&valuations, &q).into_iter().cloned().collect()))
}

pub async fn player_value(
    Path(name): Path<String>,
    Query(query): Query<PositionQuery>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<PlayerValueLookup>, AppError> {
    let valuations: Vec<PlayerValuation> = stored_valuations(&pool).await?.into_iter().map(|(_, v)| v).collect();
    let value = valuation::find_value(&valuations, &name, query.position.as_deref());
    Ok(Json(PlayerValueLookup { name, value }))
}

/// Validates raw records, quarantining rejects, and applies the accepted ones.
pub async fn import_valuations(
    Extension(pool): Extension<SqlitePool>,
    Json(records): Json<Vec<Value>>,
) -> Result<Json<ImportSummary>, AppError> {
    info!("Importing {} valuation records.", records.len());
    let ingestion = valuation::ingest(&records);
    if !ingestion.quarantined.is_empty() {
        warn!("Quarantined {} valuation records.", ingestion.quarantined.len());
    }

    let updated = valuation::apply_valuations(&pool, &ingestion.accepted).await?;
    Ok(Json(ImportSummary {
        accepted: ingestion.accepted.len(),
        updated,
        quarantined: ingestion.quarantined,
    }))
}
