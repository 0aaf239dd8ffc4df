use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::dto::cache_dto::{CacheEntry, CacheKey, CacheStats, CacheStatus, RefreshOutcome, RefreshSummary};
use crate::error::UpstreamError;
use crate::services::sleeper::SharedProvider;
use crate::services::valuation::{self, ValuationSourceError};
use crate::services::websocket::send_cache_update;

/// Platform positions kept when importing the player pool.
const IMPORTED_POSITIONS: [&str; 6] = ["QB", "RB", "WR", "TE", "K", "DEF"];

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Source(#[from] ValuationSourceError),
}

/// Tracks freshness of imported external data and refreshes it on demand.
pub struct DataCache {
    pool: SqlitePool,
    provider: SharedProvider,
    values_path: PathBuf,
}

impl DataCache {
    pub fn new(pool: SqlitePool, provider: SharedProvider, values_path: PathBuf) -> Self {
        Self {
            pool,
            provider,
            values_path,
        }
    }

    pub async fn entry(&self, key: CacheKey) -> Result<Option<CacheEntry>, sqlx::Error> {
        sqlx::query_as::<_, CacheEntry>("SELECT * FROM data_cache WHERE cache_key = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
    }

    async fn set_status(
        &self,
        key: CacheKey,
        status: CacheStatus,
        count: Option<i64>,
        metadata: Option<Value>,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let metadata = metadata.map(|m| m.to_string());

        sqlx::query(
            r#"
            INSERT INTO data_cache (cache_key, last_updated, data_count, status, metadata, created_at)
            VALUES (?, ?, COALESCE(?, 0), ?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                last_updated = excluded.last_updated,
                status = excluded.status,
                data_count = COALESCE(?, data_cache.data_count),
                metadata = COALESCE(?, data_cache.metadata)
            "#,
        )
        .bind(key.as_str())
        .bind(now)
        .bind(count)
        .bind(status.as_str())
        .bind(&metadata)
        .bind(now)
        .bind(count)
        .bind(&metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Stale when never refreshed, last refresh failed, or older than `max_age`.
    pub async fn is_stale(&self, key: CacheKey, max_age: Duration) -> Result<bool, sqlx::Error> {
        let stale = match self.entry(key).await? {
            None => true,
            Some(entry) if entry.status == CacheStatus::Failed.as_str() => true,
            Some(entry) => Utc::now() - entry.last_updated > max_age,
        };
        Ok(stale)
    }

    /// Refreshes one data set and records the outcome. Returns the number of records loaded.
    pub async fn refresh(&self, key: CacheKey) -> Result<usize, RefreshError> {
        info!("Refreshing {} data...", key);
        self.set_status(key, CacheStatus::Updating, None, None).await?;

        let result = match key {
            CacheKey::SleeperPlayers => self.refresh_sleeper_players().await,
            CacheKey::DynastyValues => self.refresh_values().await,
        };

        match &result {
            Ok(count) => {
                let source = match key {
                    CacheKey::SleeperPlayers => "sleeper_api",
                    CacheKey::DynastyValues => "curated_values",
                };
                self.set_status(
                    key,
                    CacheStatus::Active,
                    Some(*count as i64),
                    Some(json!({ "last_refresh": Utc::now().to_rfc3339(), "source": source })),
                )
                .await?;
                info!("Successfully refreshed {} {} records", count, key);
            }
            Err(e) => {
                warn!("Failed to refresh {}: {}", key, e);
                self.set_status(
                    key,
                    CacheStatus::Failed,
                    Some(0),
                    Some(json!({ "error": e.to_string(), "failed_at": Utc::now().to_rfc3339() })),
                )
                .await?;
            }
        }

        result
    }

    async fn refresh_sleeper_players(&self) -> Result<usize, RefreshError> {
        let players = self.provider.fetch_players().await?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut count = 0;

        for (key, player) in &players {
            let position = player.position.as_deref().unwrap_or_default();
            let team = player.team.as_deref().unwrap_or_default();
            let active = player.status.as_deref() == Some("Active");
            if !IMPORTED_POSITIONS.contains(&position) || team.is_empty() || team == "FA" || !active {
                continue;
            }

            let id = player.player_id.as_deref().unwrap_or(key);
            sqlx::query(
                r#"
                INSERT INTO players (
                    id, first_name, last_name, position, team, age, years_exp,
                    height, weight, status, injury_status, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    position = excluded.position,
                    team = excluded.team,
                    age = excluded.age,
                    years_exp = excluded.years_exp,
                    height = excluded.height,
                    weight = excluded.weight,
                    status = excluded.status,
                    injury_status = excluded.injury_status,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(id)
            .bind(&player.first_name)
            .bind(&player.last_name)
            .bind(position)
            .bind(team)
            .bind(player.age)
            .bind(player.years_exp)
            .bind(&player.height)
            .bind(&player.weight)
            .bind(&player.status)
            .bind(&player.injury_status)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            count += 1;
        }

        tx.commit().await?;
        info!("Upserted {} players from Sleeper", count);
        Ok(count)
    }

    async fn refresh_values(&self) -> Result<usize, RefreshError> {
        let records = valuation::load_records(&self.values_path)?;
        let ingestion = valuation::ingest(&records);
        for rejected in &ingestion.quarantined {
            warn!("Quarantined valuation record {}: {}", rejected.index, rejected.reason);
        }

        valuation::apply_valuations(&self.pool, &ingestion.accepted).await?;
        Ok(ingestion.accepted.len())
    }

    /// Players first, so values have rows to land on.
    pub async fn refresh_all(&self) -> RefreshSummary {
        info!("Starting comprehensive data refresh...");
        let sleeper = outcome(self.refresh(CacheKey::SleeperPlayers).await);
        let values = outcome(self.refresh(CacheKey::DynastyValues).await);
        RefreshSummary { sleeper, values }
    }

    /// Refreshes everything when any data set is stale. `None` means data was already current.
    pub async fn ensure_current(&self, max_age: Duration) -> Result<Option<RefreshSummary>, sqlx::Error> {
        let mut stale = false;
        for key in CacheKey::ALL {
            stale |= self.is_stale(key, max_age).await?;
        }

        if !stale {
            return Ok(None);
        }
        info!("Data is stale, refreshing...");
        Ok(Some(self.refresh_all().await))
    }

    pub async fn stats(&self) -> Result<CacheStats, sqlx::Error> {
        let caches = sqlx::query_as::<_, CacheEntry>("SELECT * FROM data_cache ORDER BY cache_key")
            .fetch_all(&self.pool)
            .await?;
        let total_players: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players")
            .fetch_one(&self.pool)
            .await?;

        Ok(CacheStats {
            caches,
            total_players,
            timestamp: Utc::now(),
        })
    }
}

pub fn outcome(result: Result<usize, RefreshError>) -> RefreshOutcome {
    match result {
        Ok(count) => RefreshOutcome {
            success: true,
            count,
            error: None,
        },
        Err(e) => RefreshOutcome {
            success: false,
            count: 0,
            error: Some(e.to_string()),
        },
    }
}

/// Periodically refreshes stale data and announces refreshes to websocket clients.
pub fn spawn_refresh_task(
    cache: Arc<DataCache>,
    tx: broadcast::Sender<String>,
    every: std::time::Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match cache.ensure_current(max_age).await {
                Ok(Some(summary)) => send_cache_update(&tx, &summary),
                Ok(None) => info!("Cached data is current."),
                Err(e) => error!("Scheduled refresh failed: {}", e),
            }
        }
    })
}
