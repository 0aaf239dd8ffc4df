use axum::{
    extract::{Extension, Json, Path, Query},
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::Config;
use crate::dto::{
    draft_dto::{CompletedPick, DraftOrderQuery, DraftOrderResponse, RosterId},
    session_dto::{ConnectRequest, ConnectResponse},
    sleeper_dto::{SleeperDraft, SleeperDraftPick, SleeperLeague},
};
use crate::error::AppError;
use crate::services::{
    data_cache::DataCache, pick_resolver::resolve_picks, sleeper::SharedProvider,
    websocket::send_cache_update,
};

pub async fn connect(
    Extension(provider): Extension<SharedProvider>,
    Extension(pool): Extension<SqlitePool>,
    Extension(cache): Extension<Arc<DataCache>>,
    Extension(config): Extension<Arc<Config>>,
    Extension(tx): Extension<broadcast::Sender<String>>,
    Json(body): Json<ConnectRequest>,
) -> Result<Json<ConnectResponse>, AppError> {
    info!("Connecting to league {} draft {}.", body.league_id, body.draft_id);
    if body.league_id.is_empty() || body.draft_id.is_empty() || body.user_id.is_empty() {
        return Err(AppError::BadRequest(
            "Missing required fields: leagueId, draftId, userId".to_string(),
        ));
    }

    let (league, draft, user) = tokio::join!(
        provider.fetch_league(&body.league_id),
        provider.fetch_draft(&body.draft_id),
        provider.fetch_user(&body.user_id),
    );
    let league = league.map_err(|_| AppError::BadRequest("Invalid league ID".to_string()))?;
    let draft = draft.map_err(|_| AppError::BadRequest("Invalid draft ID".to_string()))?;
    let user = user.map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))?;
    if draft.league_id != body.league_id {
        return Err(AppError::BadRequest(
            "Draft does not belong to specified league".to_string(),
        ));
    }

    upsert_league(&pool, &league).await?;
    upsert_draft(&pool, &draft).await?;

    match cache.ensure_current(config.cache_max_age()).await {
        Ok(Some(summary)) => {
            info!("Data refreshed automatically due to staleness.");
            send_cache_update(&tx, &summary);
        }
        Ok(None) => info!("Using cached player data."),
        Err(e) => warn!("Could not check cached data: {}", e),
    }

    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO sessions (league_id, draft_id, user_id, league_name, last_used, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(league_id, draft_id, user_id) DO UPDATE SET
            league_name = excluded.league_name,
            last_used = excluded.last_used
        "#,
    )
    .bind(&league.league_id)
    .bind(&draft.draft_id)
    .bind(&body.user_id)
    .bind(&league.name)
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await?;

    Ok(Json(ConnectResponse {
        success: true,
        league,
        draft,
        user,
    }))
}

async fn upsert_league(pool: &SqlitePool, league: &SleeperLeague) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO leagues (id, name, sport, season, status, total_rosters, settings, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            sport = excluded.sport,
            season = excluded.season,
            status = excluded.status,
            total_rosters = excluded.total_rosters,
            settings = excluded.settings
        "#,
    )
    .bind(&league.league_id)
    .bind(&league.name)
    .bind(&league.sport)
    .bind(&league.season)
    .bind(&league.status)
    .bind(league.total_rosters)
    .bind(serde_json::to_string(&league.settings)?)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

async fn upsert_draft(pool: &SqlitePool, draft: &SleeperDraft) -> Result<(), AppError> {
    let start_time = draft.start_time.and_then(DateTime::<Utc>::from_timestamp_millis);

    sqlx::query(
        r#"
        INSERT INTO drafts (id, league_id, type, status, sport, season, settings, start_time, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            league_id = excluded.league_id,
            type = excluded.type,
            status = excluded.status,
            sport = excluded.sport,
            season = excluded.season,
            settings = excluded.settings,
            start_time = excluded.start_time
        "#,
    )
    .bind(&draft.draft_id)
    .bind(&draft.league_id)
    .bind(&draft.r#type)
    .bind(&draft.status)
    .bind(&draft.sport)
    .bind(&draft.season)
    .bind(serde_json::to_string(&draft.settings)?)
    .bind(start_time)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetches completed picks and stores them locally.
pub async fn draft_picks(
    Path(draft_id): Path<String>,
    Extension(provider): Extension<SharedProvider>,
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<Vec<SleeperDraftPick>>, AppError> {
    info!("Fetching picks for draft {}.", draft_id);
    let picks = provider.fetch_completed_picks(&draft_id).await?;

    let mut tx = pool.begin().await?;
    for pick in &picks {
        let metadata = pick.metadata.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO draft_picks (draft_id, player_id, picked_by, roster_id, round, pick_no, is_keeper, metadata, picked_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(draft_id, pick_no) DO UPDATE SET
                player_id = excluded.player_id,
                picked_by = excluded.picked_by,
                roster_id = excluded.roster_id,
                round = excluded.round,
                is_keeper = excluded.is_keeper,
                metadata = excluded.metadata
            "#,
        )
        .bind(&pick.draft_id)
        .bind(&pick.player_id)
        .bind(&pick.picked_by)
        .bind(pick.roster_id)
        .bind(pick.round)
        .bind(pick.pick_no)
        .bind(pick.is_keeper.unwrap_or(false))
        .bind(metadata)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(Json(picks))
}

/// Current pick pointer plus the requesting roster's upcoming picks.
pub async fn get_draft_order(
    Path(draft_id): Path<String>,
    Query(query): Query<DraftOrderQuery>,
    Extension(provider): Extension<SharedProvider>,
) -> Result<Json<DraftOrderResponse>, AppError> {
    info!("Resolving draft order for {}.", draft_id);
    let (draft, picks) = tokio::try_join!(
        provider.fetch_draft(&draft_id),
        provider.fetch_completed_picks(&draft_id),
    )?;

    let traded = match provider.fetch_trades(&draft.league_id).await {
        Ok(traded) => traded,
        Err(e) => {
            warn!("Could not fetch traded picks for league {}: {}", draft.league_id, e);
            Vec::new()
        }
    };

    let config = draft.configuration();
    let trades = draft.ownership_trades(&traded);
    let completed: Vec<CompletedPick> = picks.iter().map(SleeperDraftPick::completed).collect();
    let requesting = query.user_id.map(RosterId::from);

    let resolution = resolve_picks(&config, &completed, &trades, requesting.as_ref())?;
    if resolution.is_draft_complete() {
        info!("Draft {} is complete.", draft_id);
    }
    Ok(Json(DraftOrderResponse::new(config, resolution)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::dto::sleeper_dto::{SleeperTradedPick, SleeperUser};
    use crate::services::sleeper::testing::FakeProvider;
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use std::path::PathBuf;

    fn draft(teams: u32, rounds: u32) -> SleeperDraft {
        let order: serde_json::Map<String, Value> =
            (1..=teams).map(|slot| (format!("u{slot}"), json!(slot))).collect();
        let slots: serde_json::Map<String, Value> =
            (1..=teams).map(|slot| (slot.to_string(), json!(slot))).collect();
        serde_json::from_value(json!({
            "draft_id": "d1",
            "league_id": "l1",
            "type": "snake",
            "status": "drafting",
            "sport": "nfl",
            "season": "2025",
            "settings": { "rounds": rounds, "teams": teams },
            "draft_order": order,
            "slot_to_roster_id": slots
        }))
        .unwrap()
    }

    fn pick(pick_no: u32, teams: u32, player: &str) -> SleeperDraftPick {
        SleeperDraftPick {
            draft_id: "d1".to_string(),
            player_id: Some(player.to_string()),
            picked_by: None,
            roster_id: None,
            round: pick_no.div_ceil(teams),
            pick_no,
            is_keeper: None,
            metadata: None,
        }
    }

    fn provider(completed: u32, trades: Option<Vec<SleeperTradedPick>>) -> FakeProvider {
        let mut fake = FakeProvider {
            trades,
            ..FakeProvider::default()
        };
        fake.drafts.insert("d1".to_string(), draft(12, 15));
        fake.picks.insert(
            "d1".to_string(),
            (1..=completed).map(|n| pick(n, 12, &format!("p{n}"))).collect(),
        );
        fake
    }

    async fn order(fake: FakeProvider, user: Option<&str>) -> Result<DraftOrderResponse, AppError> {
        get_draft_order(
            Path("d1".to_string()),
            Query(DraftOrderQuery {
                user_id: user.map(str::to_string),
            }),
            Extension(Arc::new(fake) as SharedProvider),
        )
        .await
        .map(|Json(response)| response)
    }

    #[tokio::test]
    async fn order_before_first_pick() {
        let response = order(provider(0, Some(vec![])), Some("u1")).await.unwrap();
        assert_eq!(response.current_pick.absolute_pick_number, 1);
        let picks: Vec<u32> = response.user_picks.iter().map(|p| p.absolute_pick_number).collect();
        assert_eq!(picks, vec![1, 24, 25, 48, 49]);
        assert!(response.user_picks[0].is_next);
        assert_eq!(response.settings.teams, 12);
        assert_eq!(response.draft_order.len(), 12);
    }

    #[tokio::test]
    async fn trade_failure_degrades_to_no_trades() {
        let response = order(provider(11, None), Some("u1")).await.unwrap();
        assert_eq!(response.traded_picks_count, 0);
        assert_eq!(response.current_pick.absolute_pick_number, 12);
        assert_eq!(response.user_picks[0].absolute_pick_number, 24);
        assert_eq!(response.user_picks[0].picks_away, 12);
    }

    #[tokio::test]
    async fn traded_pick_follows_new_owner() {
        let trade = SleeperTradedPick {
            season: "2025".to_string(),
            round: 3,
            roster_id: 5,
            previous_owner_id: 5,
            owner_id: 1,
        };
        let response = order(provider(0, Some(vec![trade])), Some("u1")).await.unwrap();
        assert_eq!(response.traded_picks_count, 1);
        let traded: Vec<u32> = response
            .user_picks
            .iter()
            .filter(|p| p.is_traded)
            .map(|p| p.absolute_pick_number)
            .collect();
        assert_eq!(traded, vec![29]);
    }

    #[tokio::test]
    async fn unknown_draft_is_not_found() {
        let err = order(FakeProvider { trades: Some(vec![]), ..FakeProvider::default() }, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn trade_with_unknown_roster_is_bad_request() {
        let trade = SleeperTradedPick {
            season: "2025".to_string(),
            round: 2,
            roster_id: 99,
            previous_owner_id: 99,
            owner_id: 1,
        };
        let err = order(provider(0, Some(vec![trade])), Some("u1")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn picks_are_persisted_once_per_slot() {
        let pool = test_pool().await;
        let fake: SharedProvider = Arc::new(provider(3, Some(vec![])));

        for _ in 0..2 {
            let Json(picks) = draft_picks(
                Path("d1".to_string()),
                Extension(fake.clone()),
                Extension(pool.clone()),
            )
            .await
            .unwrap();
            assert_eq!(picks.len(), 3);
        }

        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM draft_picks WHERE draft_id = 'd1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, 3);
    }

    fn connect_provider() -> FakeProvider {
        let mut fake = provider(0, Some(vec![]));
        fake.leagues.insert(
            "l1".to_string(),
            serde_json::from_value(json!({
                "league_id": "l1",
                "name": "Dynasty Degenerates",
                "sport": "nfl",
                "season": "2025",
                "status": "drafting",
                "total_rosters": 12
            }))
            .unwrap(),
        );
        fake.users.insert(
            "u1".to_string(),
            SleeperUser {
                user_id: "u1".to_string(),
                username: Some("owner1".to_string()),
                display_name: None,
                avatar: None,
            },
        );
        fake
    }

    async fn call_connect(pool: &SqlitePool, league: &str, draft: &str, user: &str) -> Result<ConnectResponse, AppError> {
        let provider: SharedProvider = Arc::new(connect_provider());
        let cache = Arc::new(DataCache::new(pool.clone(), provider.clone(), PathBuf::from("unused.json")));
        let (tx, _rx) = broadcast::channel(4);
        connect(
            Extension(provider),
            Extension(pool.clone()),
            Extension(cache),
            Extension(Arc::new(Config::default())),
            Extension(tx),
            Json(ConnectRequest {
                league_id: league.to_string(),
                draft_id: draft.to_string(),
                user_id: user.to_string(),
            }),
        )
        .await
        .map(|Json(response)| response)
    }

    #[tokio::test]
    async fn connect_stores_league_draft_and_session() {
        let pool = test_pool().await;
        for _ in 0..2 {
            let response = call_connect(&pool, "l1", "d1", "u1").await.unwrap();
            assert!(response.success);
            assert_eq!(response.league.name, "Dynasty Degenerates");
        }

        let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(sessions, 1);
        let drafts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drafts WHERE league_id = 'l1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(drafts, 1);
    }

    #[tokio::test]
    async fn connect_rejects_invalid_ids() {
        let pool = test_pool().await;

        let err = call_connect(&pool, "", "d1", "u1").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = call_connect(&pool, "nope", "d1", "u1").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid league ID");

        let err = call_connect(&pool, "l1", "d1", "ghost").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid user ID");
    }
}
