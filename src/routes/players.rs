use axum::extract::{Extension, Json, Path, Query};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::info;

use crate::dto::player_dto::{Player, PlayerQuery, RecommendationRequest, Recommendations};
use crate::error::AppError;

const RECOMMENDATION_LIMIT: usize = 10;

/// Skill-position players with a dynasty value, highest value first.
pub(crate) async fn valued_players(pool: &SqlitePool) -> Result<Vec<Player>, sqlx::Error> {
    sqlx::query_as::<_, Player>(
        r#"
        SELECT * FROM players
        WHERE position IN ('QB', 'RB', 'WR', 'TE')
          AND dynasty_value > 0
          AND first_name IS NOT NULL AND first_name != ''
          AND last_name IS NOT NULL AND last_name != ''
        ORDER BY dynasty_value DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

fn contains_ignore_case(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(needle))
}

pub async fn get_players(
    Query(query): Query<PlayerQuery>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<Vec<Player>>, AppError> {
    info!("Fetching players.");
    let mut players = valued_players(&pool).await?;

    if let Some(position) = query.position.as_deref().filter(|p| !p.is_empty()) {
        players.retain(|p| p.position.as_deref() == Some(position));
    }
    if let Some(team) = query.team.as_deref().filter(|t| !t.is_empty()) {
        players.retain(|p| p.team.as_deref() == Some(team));
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        players.retain(|p| {
            contains_ignore_case(p.first_name.as_deref(), &needle)
                || contains_ignore_case(p.last_name.as_deref(), &needle)
                || contains_ignore_case(p.team.as_deref(), &needle)
                || contains_ignore_case(p.position.as_deref(), &needle)
        });
    }

    Ok(Json(players))
}

pub async fn get_player(
    Path(id): Path<String>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<Player>, AppError> {
    info!("Fetching player {}.", id);
    sqlx::query_as::<_, Player>("SELECT * FROM players WHERE id = ?")
        .bind(&id)
        .fetch_optional(&pool)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Player not found".to_string()))
}

/// Best remaining players by value, excluding those already drafted.
pub async fn recommendations(
    Extension(pool): Extension<SqlitePool>,
    Json(body): Json<RecommendationRequest>,
) -> Result<Json<Recommendations>, AppError> {
    info!("Generating recommendations, {} players drafted.", body.drafted_players.len());
    let drafted: HashSet<&str> = body.drafted_players.iter().map(String::as_str).collect();

    let recommendations = valued_players(&pool)
        .await?
        .into_iter()
        .filter(|p| !drafted.contains(p.id.as_str()))
        .take(RECOMMENDATION_LIMIT)
        .collect();

    Ok(Json(Recommendations { recommendations }))
}
