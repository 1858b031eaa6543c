//! Tic-tac-toe played by three cooperating LLM agents.
//!
//! A human plays X over HTTP; O is chosen by a fixed pipeline of agents,
//! each wrapping one prompt, one LLM call and a deterministic fallback.
//!
//! # Architecture
//!
//! - **Agents**: Scout (board analysis), Strategist (planning), Executor (commit)
//! - **Coordinator**: Scout, then win/block short-circuits, then Strategist and Executor
//! - **Server**: axum REST routes plus a per-agent JSON-RPC facade
//! - **Dashboard**: ratatui client polling the server
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tictactoe_agents::{AppConfig, AppState, Credentials, router};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let state = AppState::from_config(AppConfig::default(), Credentials::from_env());
//! let app = router(Arc::new(state));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod agents;
mod config;
mod coordinator;
mod llm_client;
mod mcp;
mod metrics;
mod model_registry;
mod protocol_log;
mod query;
mod server;
mod session;
mod state;
mod tui;

// Crate-level exports - Agents
pub use agents::{
    Agent, AgentCore, AgentError, AgentRole, AgentSet, AgentStatus, BoardArgs, Cell, Execution,
    ExecuteMoveArgs, ExecutionStatus, Executor, GamePhase, MoveArgs, MoveValidation, Observation,
    PatternAnalysis, Plan, PositionEvaluation, Placeholder, PromptSpec, Scout, Strategist,
    ToolError, WinProbability, assess_win_probability, board_from_rows, describe_board,
    evaluate_position, extract_json, extract_move, format_cells, heuristic_move, pattern_analysis,
    schema_of, side_to_move, validate_move,
};

// Crate-level exports - Configuration
pub use config::{
    ApiConfig, AppConfig, ConfigError, Credentials, DEFAULT_CONFIG_FILE, DEFAULT_OLLAMA_URL,
    DashboardConfig, ModelsConfig, PerformanceConfig,
};

// Crate-level exports - Coordination
pub use coordinator::{Coordinator, Decision, DecisionPath};

// Crate-level exports - LLM client
pub use llm_client::{
    Completion, CompletionBackend, LlmClient, LlmConfig, LlmError, LlmProvider, estimate_tokens,
};

// Crate-level exports - JSON-RPC facade
pub use mcp::{
    McpRequest, McpResponse, NoArgs, PROTOCOL_VERSION, SwitchModelArgs, all_tools, discovery,
    handle as handle_rpc, handle_raw as handle_rpc_raw, prompts, resources, server_info,
    standard_tools,
};

// Crate-level exports - Metrics and protocol log
pub use metrics::{AgentMetrics, RECENT_REQUESTS, RequestRecord};
pub use protocol_log::{ProtocolLog, ProtocolLogEntry};

// Crate-level exports - Model registry
pub use model_registry::{
    LifecycleStatus, ModelAvailability, ModelEntry, ModelRegistry, OLLAMA_INVENTORY_TIMEOUT, OllamaInventory,
    RegistryError,
};

// Crate-level exports - Query CLI
pub use query::{QueryClient, parse_params, run_query};

// Crate-level exports - HTTP server
pub use server::{
    ApiError, ErrorResponse, LogQuery, MoveRequest, SwitchModelRequest, bind, router, serve, serve_on,
};

// Crate-level exports - Game session and shared state
pub use session::{AI, GameSession, GameSnapshot, HUMAN, SessionError};
pub use state::{AiMove, AppState, HealthReport, ModelSwitch};

// Crate-level exports - Dashboard
pub use tui::{AgentRow, Dashboard, DashboardClient, LOG_FILE, key_to_cell, poll, run_dashboard};
