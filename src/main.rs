use anyhow::Context;
use axum::{
    extract::Extension,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;

mod dto {
    pub mod cache_dto;
    pub mod draft_dto;
    pub mod mock_draft_dto;
    pub mod player_dto;
    pub mod session_dto;
    pub mod sleeper_dto;
}

mod routes {
    pub mod data_cache;
    pub mod draft;
    pub mod mock_drafts;
    pub mod players;
    pub mod sessions;
    pub mod valuations;
    pub mod watchlist;
}

mod services {
    pub mod data_cache;
    pub mod pick_resolver;
    pub mod sleeper;
    pub mod valuation;
    pub mod websocket;
}

use config::Config;
use services::{
    data_cache::{spawn_refresh_task, DataCache},
    sleeper::{SharedProvider, SleeperClient},
    websocket::websocket_handler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dynasty_draft=info,tower_http=info")),
        )
        .init();

    let config = Arc::new(Config::load().context("Could not load configuration")?);
    let pool = db::connect(&config).await.context("Could not connect to SQLite")?;

    let provider: SharedProvider = Arc::new(
        SleeperClient::new(config.sleeper_base_url.clone(), config.request_timeout())
            .context("Could not build Sleeper client")?,
    );
    let cache = Arc::new(DataCache::new(pool.clone(), provider.clone(), config.values_path.clone()));
    let (tx, _rx) = broadcast::channel::<String>(100);

    spawn_refresh_task(cache.clone(), tx.clone(), config.refresh_interval(), config.cache_max_age());

    let app = Router::new()
        .route("/api/sleeper/connect", post(routes::draft::connect))
        .route("/api/sleeper/draft/{draft_id}/picks", get(routes::draft::draft_picks))
        .route("/api/sleeper/draft/{draft_id}/order", get(routes::draft::get_draft_order))
        .route("/drafts/{draft_id}/order", get(routes::draft::get_draft_order))
        .route("/api/players", get(routes::players::get_players))
        .route("/api/players/{id}", get(routes::players::get_player))
        .route("/api/recommendations", post(routes::players::recommendations))
        .route("/api/valuations", get(routes::valuations::get_valuations))
        .route("/api/valuations/search", get(routes::valuations::search_valuations))
        .route("/api/valuations/player/{name}", get(routes::valuations::player_value))
        .route("/api/valuations/import", post(routes::valuations::import_valuations))
        .route("/api/data-cache/status", get(routes::data_cache::cache_status))
        .route("/api/data-cache/refresh", post(routes::data_cache::refresh_all))
        .route("/api/data-cache/refresh/{key}", post(routes::data_cache::refresh_one))
        .route("/api/mock-drafts", post(routes::mock_drafts::create_mock_draft))
        .route("/api/mock-drafts/user/{user_id}", get(routes::mock_drafts::get_user_mock_drafts))
        .route("/api/mock-drafts/picks/slot", get(routes::mock_drafts::picks_at_slot))
        .route(
            "/api/mock-drafts/{id}",
            get(routes::mock_drafts::get_mock_draft)
                .put(routes::mock_drafts::update_mock_draft)
                .delete(routes::mock_drafts::delete_mock_draft),
        )
        .route(
            "/api/mock-drafts/{id}/picks",
            get(routes::mock_drafts::get_mock_draft_picks).post(routes::mock_drafts::add_mock_draft_pick),
        )
        .route("/api/watchlist", post(routes::watchlist::add_to_watchlist))
        .route(
            "/api/watchlist/{id}",
            get(routes::watchlist::get_watchlist).delete(routes::watchlist::remove_from_watchlist),
        )
        .route("/api/sessions", get(routes::sessions::get_sessions))
        .route("/api/sessions/{id}", delete(routes::sessions::delete_session))
        .route("/ws", get(websocket_handler))
        .layer(Extension(pool))
        .layer(Extension(provider))
        .layer(Extension(cache))
        .layer(Extension(config.clone()))
        .layer(Extension(tx))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Could not bind {}", config.bind_addr))?;
    info!("Started server on {}.", config.bind_addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
