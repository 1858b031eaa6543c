//! REST client the dashboard polls the backend with.

use crate::agents::AgentStatus;
use crate::metrics::AgentMetrics;
use crate::protocol_log::ProtocolLogEntry;
use crate::server::ErrorResponse;
use crate::session::GameSnapshot;
use crate::state::AiMove;
use anyhow::{Result, anyhow};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, warn};

#[derive(Debug, Deserialize)]
struct AgentsBody {
    agents: Vec<AgentStatus>,
}

#[derive(Debug, Deserialize)]
struct LogsBody {
    entries: Vec<ProtocolLogEntry>,
}

/// Thin wrapper over the backend's REST routes.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    base_url: String,
    client: reqwest::Client,
}

impl DashboardClient {
    /// Client for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        warn!(%status, %message, "Backend returned an error");
        Err(anyhow!("{message}"))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        let response = self.client.get(format!("{}{}", self.base_url, path)).send().await?;
        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        debug!(path, "POST");
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Current game.
    pub async fn game_state(&self) -> Result<GameSnapshot> {
        self.get("/game/state").await
    }

    /// Plays the human move.
    #[instrument(skip(self))]
    pub async fn make_move(&self, row: usize, col: usize) -> Result<()> {
        let _: serde_json::Value = self.post("/game/move", json!({ "row": row, "col": col })).await?;
        Ok(())
    }

    /// Asks the agents to play.
    #[instrument(skip(self))]
    pub async fn ai_move(&self) -> Result<AiMove> {
        self.post("/game/ai-move", json!({})).await
    }

    /// Starts a new game.
    pub async fn reset(&self) -> Result<()> {
        let _: serde_json::Value = self.post("/game/reset", json!({})).await?;
        Ok(())
    }

    /// Status of every agent.
    pub async fn agent_statuses(&self) -> Result<Vec<AgentStatus>> {
        Ok(self.get::<AgentsBody>("/agents/status").await?.agents)
    }

    /// Metrics for one agent.
    pub async fn agent_metrics(&self, agent_id: &str) -> Result<AgentMetrics> {
        self.get(&format!("/agents/{agent_id}/metrics")).await
    }

    /// The most recent `limit` protocol log entries.
    pub async fn recent_logs(&self, limit: usize) -> Result<Vec<ProtocolLogEntry>> {
        Ok(self.get::<LogsBody>(&format!("/mcp/logs?limit={limit}")).await?.entries)
    }
}
