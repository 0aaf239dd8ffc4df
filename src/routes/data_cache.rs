use axum::extract::{Extension, Json, Path};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use crate::dto::cache_dto::{CacheKey, CacheStats, RefreshOutcome, RefreshSummary};
use crate::error::AppError;
use crate::services::data_cache::{outcome, DataCache};
use crate::services::websocket::send_cache_update;

pub async fn cache_status(Extension(cache): Extension<Arc<DataCache>>) -> Result<Json<CacheStats>, AppError> {
    Ok(Json(cache.stats().await?))
}

pub async fn refresh_all(
    Extension(cache): Extension<Arc<DataCache>>,
    Extension(tx): Extension<broadcast::Sender<String>>,
) -> Json<RefreshSummary> {
    info!("Manual refresh of all cached data.");
    let summary = cache.refresh_all().await;
    send_cache_update(&tx, &summary);
    Json(summary)
}

pub async fn refresh_one(
    Path(key): Path<String>,
    Extension(cache): Extension<Arc<DataCache>>,
) -> Result<Json<RefreshOutcome>, AppError> {
    let key = CacheKey::parse(&key)
        .ok_or_else(|| AppError::NotFound(format!("Unknown cache key: {key}")))?;
    info!("Manual refresh of {}.", key);
    Ok(Json(outcome(cache.refresh(key).await)))
}
