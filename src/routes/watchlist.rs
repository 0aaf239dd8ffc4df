use axum::extract::{Extension, Json, Path};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::dto::session_dto::{CreateWatchlistEntry, Deleted, WatchlistEntry};
use crate::error::AppError;

pub async fn get_watchlist(
    Path(user_id): Path<String>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<Vec<WatchlistEntry>>, AppError> {
    info!("Fetching watchlist for {}.", user_id);
    let entries = sqlx::query_as::<_, WatchlistEntry>(
        "SELECT * FROM watchlists WHERE user_id = ? ORDER BY created_at",
    )
    .bind(&user_id)
    .fetch_all(&pool)
    .await?;
    Ok(Json(entries))
}

pub async fn add_to_watchlist(
    Extension(pool): Extension<SqlitePool>,
    Json(body): Json<CreateWatchlistEntry>,
) -> Result<Json<WatchlistEntry>, AppError> {
    if body.user_id.trim().is_empty() || body.player_id.trim().is_empty() {
        return Err(AppError::BadRequest("Invalid watchlist data".to_string()));
    }

    let entry = sqlx::query_as::<_, WatchlistEntry>(
        "INSERT INTO watchlists (user_id, player_id, notes, created_at) VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(&body.user_id)
    .bind(&body.player_id)
    .bind(&body.notes)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await?;

    info!("Added {} to watchlist of {}.", entry.player_id, entry.user_id);
    Ok(Json(entry))
}

pub async fn remove_from_watchlist(
    Path(id): Path<i64>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<Deleted>, AppError> {
    let result = sqlx::query("DELETE FROM watchlists WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Watchlist item not found".to_string()));
    }
    Ok(Json(Deleted { success: true }))
}
