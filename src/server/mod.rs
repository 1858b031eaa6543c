//! HTTP backend: game, agents, models and the per-agent JSON-RPC endpoints.

mod error;
mod handlers;

pub use error::{ApiError, ErrorResponse};
pub use handlers::{LogQuery, MoveRequest, SwitchModelRequest};

use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

/// Builds the router with CORS open to any origin and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/game/state", get(handlers::game_state))
        .route("/game/move", post(handlers::human_move))
        .route("/game/ai-move", post(handlers::ai_move))
        .route("/game/reset", post(handlers::reset))
        .route("/game/new", post(handlers::reset))
        .route("/agents/status", get(handlers::agents_status))
        .route("/agents/{id}/metrics", get(handlers::agent_metrics))
        .route("/agents/{id}/metrics/reset", post(handlers::reset_metrics))
        .route("/agents/{id}/model", post(handlers::switch_model))
        .route("/models", get(handlers::models))
        .route("/mcp/logs", get(handlers::mcp_logs))
        .route("/mcp-logs", get(handlers::mcp_logs))
        .route("/mcp/{agent}", get(handlers::mcp_discovery).post(handlers::mcp_call))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

/// Binds `host:port`; `host` may be a name such as `localhost`.
#[instrument]
pub async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "HTTP backend listening");
    Ok(listener)
}

/// Serves on `listener` until `shutdown` resolves.
pub async fn serve_on<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

/// Serves until Ctrl-C.
#[instrument(skip(state))]
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let listener = bind(host, port).await?;
    serve_on(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await
}
