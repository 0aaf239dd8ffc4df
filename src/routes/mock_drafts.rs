use axum::extract::{Extension, Json, Path, Query};
use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use sqlx::{types::Json as SqlxJson, SqlitePool};
use tokio::sync::broadcast;
use tracing::info;

use crate::dto::mock_draft_dto::{
    CreateMockDraft, CreateMockDraftPick, MockDraft, MockDraftPick, SlotQuery, UpdateMockDraft,
    MAX_MOCK_DIMENSION,
};
use crate::dto::session_dto::Deleted;
use crate::error::AppError;
use crate::services::websocket::send_mock_draft_update;

fn generate_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("mock_{}_{}", Utc::now().timestamp_millis(), suffix.to_lowercase())
}

async fn find_mock_draft(pool: &SqlitePool, id: &str) -> Result<MockDraft, AppError> {
    sqlx::query_as::<_, MockDraft>("SELECT * FROM mock_drafts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Mock draft not found".to_string()))
}

pub async fn create_mock_draft(
    Extension(pool): Extension<SqlitePool>,
    Json(body): Json<CreateMockDraft>,
) -> Result<Json<MockDraft>, AppError> {
    let dimensions = 1..=MAX_MOCK_DIMENSION;
    if !dimensions.contains(&body.total_rounds()) || !dimensions.contains(&body.total_teams()) {
        return Err(AppError::BadRequest(format!(
            "Mock draft rounds and teams must be within 1..={MAX_MOCK_DIMENSION}"
        )));
    }

    let id = body.id.clone().filter(|id| !id.is_empty()).unwrap_or_else(generate_id);
    info!("Creating mock draft {} for {}.", id, body.user_id);
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO mock_drafts (
            id, user_id, name, league_settings, draft_order, picks,
            current_pick, is_completed, total_rounds, total_teams, notes, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&body.user_id)
    .bind(&body.name)
    .bind(SqlxJson(&body.league_settings))
    .bind(SqlxJson(&body.draft_order))
    .bind(SqlxJson(&body.picks))
    .bind(body.current_pick.unwrap_or(1))
    .bind(body.is_completed.unwrap_or(false))
    .bind(body.total_rounds())
    .bind(body.total_teams())
    .bind(&body.notes)
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await?;

    Ok(Json(find_mock_draft(&pool, &id).await?))
}

pub async fn get_user_mock_drafts(
    Path(user_id): Path<String>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<Vec<MockDraft>>, AppError> {
    info!("Fetching mock drafts for {}.", user_id);
    let drafts = sqlx::query_as::<_, MockDraft>(
        "SELECT * FROM mock_drafts WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(&user_id)
    .fetch_all(&pool)
    .await?;
    Ok(Json(drafts))
}

pub async fn get_mock_draft(
    Path(id): Path<String>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<MockDraft>, AppError> {
    Ok(Json(find_mock_draft(&pool, &id).await?))
}

pub async fn update_mock_draft(
    Path(id): Path<String>,
    Extension(pool): Extension<SqlitePool>,
    Json(body): Json<UpdateMockDraft>,
) -> Result<Json<MockDraft>, AppError> {
    info!("Updating mock draft {}.", id);
    let mut draft = find_mock_draft(&pool, &id).await?;

    if let Some(name) = body.name {
        draft.name = name;
    }
    if let Some(settings) = body.league_settings {
        draft.league_settings = SqlxJson(settings);
    }
    if let Some(order) = body.draft_order {
        draft.draft_order = SqlxJson(order);
    }
    if let Some(picks) = body.picks {
        draft.picks = SqlxJson(picks);
    }
    if let Some(current_pick) = body.current_pick {
        draft.current_pick = current_pick;
    }
    if let Some(is_completed) = body.is_completed {
        draft.is_completed = is_completed;
    }
    if let Some(notes) = body.notes {
        draft.notes = notes;
    }
    draft.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE mock_drafts
        SET name = ?, league_settings = ?, draft_order = ?, picks = ?,
            current_pick = ?, is_completed = ?, notes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&draft.name)
    .bind(&draft.league_settings)
    .bind(&draft.draft_order)
    .bind(&draft.picks)
    .bind(draft.current_pick)
    .bind(draft.is_completed)
    .bind(&draft.notes)
    .bind(draft.updated_at)
    .bind(&id)
    .execute(&pool)
    .await?;

    Ok(Json(draft))
}

pub async fn delete_mock_draft(
    Path(id): Path<String>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<Deleted>, AppError> {
    info!("Deleting mock draft {}.", id);
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM mock_draft_picks WHERE mock_draft_id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM mock_drafts WHERE id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Mock draft not found".to_string()));
    }
    Ok(Json(Deleted { success: true }))
}

pub async fn get_mock_draft_picks(
    Path(id): Path<String>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<Vec<MockDraftPick>>, AppError> {
    let picks = sqlx::query_as::<_, MockDraftPick>(
        "SELECT * FROM mock_draft_picks WHERE mock_draft_id = ? ORDER BY pick",
    )
    .bind(&id)
    .fetch_all(&pool)
    .await?;
    Ok(Json(picks))
}

/// `(round - 1) * teams + round_pick`, or `None` when it does not fit in an `i64`.
fn checked_pick_number(round: i64, round_pick: i64, teams: i64) -> Option<i64> {
    (round - 1).checked_mul(teams)?.checked_add(round_pick)
}

/// Records a pick and advances the mock draft's pointer past it. The pointer never moves back.
pub async fn add_mock_draft_pick(
    Path(id): Path<String>,
    Extension(pool): Extension<SqlitePool>,
    Extension(tx): Extension<broadcast::Sender<String>>,
    Json(body): Json<CreateMockDraftPick>,
) -> Result<Json<MockDraftPick>, AppError> {
    let draft = find_mock_draft(&pool, &id).await?;

    if !(1..=draft.total_rounds).contains(&body.round) {
        return Err(AppError::BadRequest(format!(
            "round {} is outside 1..={}",
            body.round, draft.total_rounds
        )));
    }
    if !(1..=draft.total_teams).contains(&body.round_pick) {
        return Err(AppError::BadRequest(format!(
            "round pick {} is outside 1..={}",
            body.round_pick, draft.total_teams
        )));
    }
    let overflow = || AppError::BadRequest("mock draft is too large".to_string());
    let expected =
        checked_pick_number(body.round, body.round_pick, draft.total_teams).ok_or_else(overflow)?;
    let total_picks = draft.total_rounds.checked_mul(draft.total_teams).ok_or_else(overflow)?;
    if body.pick != expected {
        return Err(AppError::BadRequest(format!(
            "pick {} does not match round {} pick {} (expected {})",
            body.pick, body.round, body.round_pick, expected
        )));
    }

    info!("Mock draft {}: pick {} by {}.", id, body.pick, body.team_id);
    let now = Utc::now();
    let is_completed = body.pick >= total_picks;

    let mut db_tx = pool.begin().await?;
    let pick_id = sqlx::query(
        r#"
        INSERT INTO mock_draft_picks (
            mock_draft_id, round, pick, round_pick, team_id, player_id,
            player_name, player_position, player_team, picked_at, is_user_pick
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(body.round)
    .bind(body.pick)
    .bind(body.round_pick)
    .bind(&body.team_id)
    .bind(&body.player_id)
    .bind(&body.player_name)
    .bind(&body.player_position)
    .bind(&body.player_team)
    .bind(now)
    .bind(body.is_user_pick)
    .execute(&mut *db_tx)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::BadRequest(format!("pick {} is already recorded", body.pick))
        }
        e => AppError::from(e),
    })?
    .last_insert_rowid();

    sqlx::query(
        r#"
        UPDATE mock_drafts
        SET current_pick = MAX(current_pick, ?), is_completed = (is_completed OR ?), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(body.pick + 1)
    .bind(is_completed)
    .bind(now)
    .bind(&id)
    .execute(&mut *db_tx)
    .await?;
    db_tx.commit().await?;

    let pick = MockDraftPick {
        id: pick_id,
        mock_draft_id: id,
        round: body.round,
        pick: body.pick,
        round_pick: body.round_pick,
        team_id: body.team_id,
        player_id: body.player_id,
        player_name: body.player_name,
        player_position: body.player_position,
        player_team: body.player_team,
        picked_at: now,
        is_user_pick: body.is_user_pick,
    };
    send_mock_draft_update(&tx, &pick.mock_draft_id, &pick);

    Ok(Json(pick))
}

/// Every pick ever made at a round/slot across mock drafts, newest first.
pub async fn picks_at_slot(
    Query(query): Query<SlotQuery>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<Vec<MockDraftPick>>, AppError> {
    let (Some(round), Some(pick)) = (query.round, query.pick) else {
        return Err(AppError::BadRequest(
            "Round and pick parameters are required".to_string(),
        ));
    };

    let picks = sqlx::query_as::<_, MockDraftPick>(
        "SELECT * FROM mock_draft_picks WHERE round = ? AND round_pick = ? ORDER BY picked_at DESC",
    )
    .bind(round)
    .bind(pick)
    .fetch_all(&pool)
    .await?;
    Ok(Json(picks))
}
