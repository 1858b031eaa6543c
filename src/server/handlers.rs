//! Route handlers.

use super::error::ApiError;
use crate::agents::AgentRole;
use crate::mcp::{self, McpResponse};
use crate::metrics::AgentMetrics;
use crate::session::GameSnapshot;
use crate::state::{AiMove, AppState, HealthReport, ModelSwitch};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, instrument};

type Shared = State<Arc<AppState>>;

/// `POST /game/move` body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
}

/// `POST /agents/{id}/model` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchModelRequest {
    /// Registry model name.
    pub model: String,
}

/// `GET /mcp/logs` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogQuery {
    /// Most recent entries to return; all when absent.
    pub limit: Option<usize>,
}

fn role(id: &str) -> Result<AgentRole, ApiError> {
    AgentRole::from_id(id).ok_or_else(|| ApiError::NotFound(format!("Unknown agent: {id}")))
}

pub(super) async fn health(State(state): Shared) -> Json<HealthReport> {
    Json(state.health().await)
}

pub(super) async fn game_state(State(state): Shared) -> Json<GameSnapshot> {
    Json(state.session().snapshot().await)
}

/// Malformed bodies are rejected as [`ApiError::BadRequest`].
#[instrument(skip(state, payload))]
pub(super) async fn human_move(
    State(state): Shared,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let (mv, game) = state.human_move(req.row, req.col).await?;
    info!(row = req.row, col = req.col, "Human move");
    Ok(Json(json!({ "success": true, "move": mv, "game": game })))
}

#[instrument(skip(state))]
pub(super) async fn ai_move(State(state): Shared) -> Result<Json<AiMove>, ApiError> {
    Ok(Json(state.ai_move().await?))
}

pub(super) async fn reset(State(state): Shared) -> Json<Value> {
    let game = state.reset().await;
    Json(json!({ "success": true, "game": game }))
}

pub(super) async fn agents_status(State(state): Shared) -> Json<Value> {
    Json(json!({ "agents": state.agent_statuses().await }))
}

pub(super) async fn agent_metrics(State(state): Shared, Path(id): Path<String>) -> Result<Json<AgentMetrics>, ApiError> {
    Ok(Json(state.agent_metrics(role(&id)?).await))
}

#[instrument(skip(state))]
pub(super) async fn reset_metrics(State(state): Shared, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let role = role(&id)?;
    state.agents().get(role).core().reset_metrics().await;
    Ok(Json(json!({ "success": true, "agent_id": role.id() })))
}

#[instrument(skip(state, payload))]
pub(super) async fn switch_model(
    State(state): Shared,
    Path(id): Path<String>,
    payload: Result<Json<SwitchModelRequest>, JsonRejection>,
) -> Result<Json<ModelSwitch>, ApiError> {
    let role = role(&id)?;
    let Json(req) = payload?;
    Ok(Json(state.switch_model(role, &req.model).await?))
}

pub(super) async fn models(State(state): Shared) -> Json<Value> {
    let models = state.model_availability().await;
    Json(json!({ "count": models.len(), "models": models }))
}

pub(super) async fn mcp_logs(State(state): Shared, Query(query): Query<LogQuery>) -> Json<Value> {
    let entries = match query.limit {
        Some(n) => state.log().recent(n).await,
        None => state.log().entries().await,
    };
    Json(json!({ "count": entries.len(), "entries": entries }))
}

pub(super) async fn mcp_discovery(State(state): Shared, Path(agent): Path<String>) -> Result<Json<Value>, ApiError> {
    Ok(Json(mcp::discovery(&state, role(&agent)?).await))
}

/// JSON-RPC errors travel in the body with HTTP 200.
#[instrument(skip(state, body))]
pub(super) async fn mcp_call(
    State(state): Shared,
    Path(agent): Path<String>,
    body: String,
) -> Result<Json<McpResponse>, ApiError> {
    let role = role(&agent)?;
    debug!(bytes = body.len(), "JSON-RPC request");
    Ok(Json(mcp::handle_raw(&state, role, &body).await))
}
