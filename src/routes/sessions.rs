use axum::extract::{Extension, Json, Path};
use sqlx::SqlitePool;
use tracing::info;

use crate::dto::session_dto::{Deleted, Session};
use crate::error::AppError;

pub async fn get_sessions(Extension(pool): Extension<SqlitePool>) -> Result<Json<Vec<Session>>, AppError> {
    info!("Fetching sessions.");
    let sessions = sqlx::query_as::<_, Session>("SELECT * FROM sessions ORDER BY last_used DESC")
        .fetch_all(&pool)
        .await?;
    Ok(Json(sessions))
}

pub async fn delete_session(
    Path(id): Path<i64>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<Deleted>, AppError> {
    info!("Deleting session {}.", id);
    let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Session not found".to_string()));
    }
    Ok(Json(Deleted { success: true }))
}
