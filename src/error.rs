use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::dto::draft_dto::RosterId;

/// Draft configuration or trade data that cannot be resolved into pick ownership.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("draft must have at least one round")]
    NoRounds,

    #[error("draft must have at least one team")]
    NoTeams,

    #[error("slot assignment has {assigned} rosters but the draft has {teams} teams")]
    SlotCountMismatch { assigned: usize, teams: u32 },

    #[error("roster {roster} is assigned slot {slot}, outside 1..={teams}")]
    SlotOutOfRange { roster: RosterId, slot: u32, teams: u32 },

    #[error("slot {slot} is assigned to more than one roster")]
    DuplicateSlot { slot: u32 },

    #[error("trade for round {round} references unknown roster {roster}")]
    UnknownTradeRoster { round: u32, roster: RosterId },

    #[error("trade references round {round} but the draft has {rounds} rounds")]
    TradeRoundOutOfRange { round: u32, rounds: u32 },
}

/// Failures talking to the fantasy platform.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Sleeper resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Sleeper API rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Sleeper API error: {status} for {resource}")]
    Status {
        status: reqwest::StatusCode,
        resource: String,
    },

    #[error("Network error accessing Sleeper API: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::Upstream(UpstreamError::NotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
