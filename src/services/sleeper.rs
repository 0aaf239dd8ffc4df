use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::dto::sleeper_dto::{
    SleeperDraft, SleeperDraftPick, SleeperLeague, SleeperPlayer, SleeperTradedPick, SleeperUser,
};
use crate::error::UpstreamError;

pub const SLEEPER_BASE_URL: &str = "https://api.sleeper.app/v1";
const USER_AGENT: &str = "Dynasty-Draft-Analyzer/1.0";

/// Source of league, draft and player data.
#[async_trait]
pub trait DraftDataProvider: Send + Sync {
    async fn fetch_user(&self, user_id: &str) -> Result<SleeperUser, UpstreamError>;
    async fn fetch_league(&self, league_id: &str) -> Result<SleeperLeague, UpstreamError>;
    async fn fetch_draft(&self, draft_id: &str) -> Result<SleeperDraft, UpstreamError>;
    async fn fetch_completed_picks(&self, draft_id: &str) -> Result<Vec<SleeperDraftPick>, UpstreamError>;
    async fn fetch_trades(&self, league_id: &str) -> Result<Vec<SleeperTradedPick>, UpstreamError>;
    async fn fetch_players(&self) -> Result<HashMap<String, SleeperPlayer>, UpstreamError>;
}

pub type SharedProvider = Arc<dyn DraftDataProvider>;

#[derive(Debug, Clone)]
pub struct SleeperClient {
    client: Client,
    base_url: String,
}

impl SleeperClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, UpstreamError> {
        let url = format!("{}{}", self.base_url, endpoint);
        info!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(UpstreamError::NotFound {
                resource: endpoint.to_string(),
            }),
            StatusCode::TOO_MANY_REQUESTS => Err(UpstreamError::RateLimited),
            status if !status.is_success() => Err(UpstreamError::Status {
                status,
                resource: endpoint.to_string(),
            }),
            _ => Ok(response.json::<T>().await?),
        }
    }
}

#[async_trait]
impl DraftDataProvider for SleeperClient {
    async fn fetch_user(&self, user_id: &str) -> Result<SleeperUser, UpstreamError> {
        self.get(&format!("/user/{user_id}")).await
    }

    async fn fetch_league(&self, league_id: &str) -> Result<SleeperLeague, UpstreamError> {
        self.get(&format!("/league/{league_id}")).await
    }

    async fn fetch_draft(&self, draft_id: &str) -> Result<SleeperDraft, UpstreamError> {
        self.get(&format!("/draft/{draft_id}")).await
    }

    async fn fetch_completed_picks(&self, draft_id: &str) -> Result<Vec<SleeperDraftPick>, UpstreamError> {
        self.get(&format!("/draft/{draft_id}/picks")).await
    }

    async fn fetch_trades(&self, league_id: &str) -> Result<Vec<SleeperTradedPick>, UpstreamError> {
        self.get(&format!("/league/{league_id}/traded_picks")).await
    }

    async fn fetch_players(&self) -> Result<HashMap<String, SleeperPlayer>, UpstreamError> {
        self.get("/players/nfl").await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    async fn client_for(server: &MockServer) -> SleeperClient {
        SleeperClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fetches_draft_with_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/draft/d1"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "draft_id": "d1",
                "league_id": "l1",
                "type": "snake",
                "status": "drafting",
                "sport": "nfl",
                "season": "2025",
                "settings": { "rounds": 4, "teams": 2 },
                "start_time": null,
                "draft_order": { "u1": 1, "u2": 2 }
            })))
            .mount(&server)
            .await;

        let draft = client_for(&server).await.fetch_draft("d1").await.unwrap();
        assert_eq!(draft.league_id, "l1");
        assert_eq!(draft.configuration().total_rounds, 4);
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/draft/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch_draft("missing").await.unwrap_err();
        assert!(matches!(err, UpstreamError::NotFound { resource } if resource == "/draft/missing"));
    }

    #[tokio::test]
    async fn rate_limit_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/league/l1/traded_picks"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch_trades("l1").await.unwrap_err();
        assert!(matches!(err, UpstreamError::RateLimited));
    }

    #[tokio::test]
    async fn server_error_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/draft/d1/picks"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .fetch_completed_picks("d1")
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn decodes_traded_picks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/league/l1/traded_picks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "season": "2025", "round": 3, "roster_id": 5, "previous_owner_id": 5, "owner_id": 1 }
            ])))
            .mount(&server)
            .await;

        let trades = client_for(&server).await.fetch_trades("l1").await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].owner_id, 1);
    }
}
