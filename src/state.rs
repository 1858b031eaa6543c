//! Everything the HTTP handlers and the JSON-RPC facade share.

use crate::agents::{
    AgentCore, AgentRole, AgentSet, AgentStatus, Executor, Observation, Scout, Strategist,
    heuristic_move,
};
use crate::config::{AppConfig, Credentials};
use crate::coordinator::{Coordinator, Decision, DecisionPath};
use crate::llm_client::CompletionBackend;
use crate::metrics::AgentMetrics;
use crate::model_registry::{ModelAvailability, ModelRegistry, RegistryError};
use crate::protocol_log::ProtocolLog;
use crate::session::{AI, GameSession, GameSnapshot, HUMAN, SessionError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tictactoe_core::{Move, MoveError};
use tracing::{info, instrument, warn};

/// Result of `POST /game/ai-move`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiMove {
    /// The move played.
    #[serde(rename = "move")]
    pub mv: Move,
    /// How it was chosen.
    pub decision: Decision,
    /// Game after the move.
    pub game: GameSnapshot,
}

/// Result of a model hot swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSwitch {
    /// Always true; failures are errors.
    pub success: bool,
    /// Agent id.
    pub agent_id: String,
    /// Model before the switch.
    pub old_model: String,
    /// Model after the switch.
    pub new_model: String,
}

/// `GET /health` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Always `healthy` when the server answers.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since startup.
    pub uptime_secs: u64,
    /// Agent id to current model.
    pub agents: BTreeMap<String, String>,
}

/// Shared application state.
pub struct AppState {
    config: AppConfig,
    credentials: Credentials,
    registry: ModelRegistry,
    coordinator: Coordinator,
    session: GameSession,
    log: Arc<ProtocolLog>,
    http: reqwest::Client,
    started_at: Instant,
}

impl AppState {
    /// Assembles state around prebuilt agents.
    pub fn new(config: AppConfig, credentials: Credentials, registry: ModelRegistry, agents: AgentSet) -> Self {
        let log = Arc::new(ProtocolLog::default());
        Self {
            coordinator: Coordinator::new(agents, log.clone()),
            config,
            credentials,
            registry,
            session: GameSession::new(),
            log,
            http: reqwest::Client::new(),
            started_at: Instant::now(),
        }
    }

    /// Builds the agents from `config`, each with its configured model or
    /// the first fallback that can be built. An agent with no buildable
    /// model starts degraded.
    #[instrument(skip_all)]
    pub fn from_config(config: AppConfig, credentials: Credentials) -> Self {
        let registry = ModelRegistry::with_defaults();
        let timeout = Duration::from_secs(*config.performance().agent_execution_timeout());
        let metrics_enabled = *config.performance().enable_metrics();

        let core = |role: AgentRole| {
            let (model, backend) = Self::initial_model(&config, &credentials, &registry, role);
            AgentCore::new(role, model, backend, timeout).with_metrics_enabled(metrics_enabled)
        };
        let agents = AgentSet::new(
            Scout::new(core(AgentRole::Scout)),
            Strategist::new(core(AgentRole::Strategist)),
            Executor::new(core(AgentRole::Executor)),
        );
        Self::new(config, credentials, registry, agents)
    }

    fn initial_model(
        config: &AppConfig,
        credentials: &Credentials,
        registry: &ModelRegistry,
        role: AgentRole,
    ) -> (String, Option<Arc<dyn CompletionBackend>>) {
        let preferred = config.models().for_role(role).to_string();
        let candidates = std::iter::once(preferred.clone()).chain(config.models().fallback().iter().cloned());
        for name in candidates {
            match registry.build_client(&name, credentials) {
                Ok(client) => {
                    if name != preferred {
                        warn!(%role, %preferred, fallback = %name, "Using fallback model");
                    }
                    return (name, Some(Arc::new(client) as Arc<dyn CompletionBackend>));
                }
                Err(e) => warn!(%role, model = %name, error = %e, "Model unavailable"),
            }
        }
        warn!(%role, "No model could be built, agent runs on heuristics");
        (preferred, None)
    }

    /// Configuration in use.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Model catalogue.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Credentials in use.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Every registry model with its current lifecycle status.
    pub async fn model_availability(&self) -> Vec<ModelAvailability> {
        self.registry.check_availability(&self.http, &self.credentials).await
    }

    /// The agents.
    pub fn agents(&self) -> &AgentSet {
        self.coordinator.agents()
    }

    /// The game.
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// The protocol log.
    pub fn log(&self) -> &ProtocolLog {
        &self.log
    }

    /// Health summary.
    pub async fn health(&self) -> HealthReport {
        let mut agents = BTreeMap::new();
        for role in AgentRole::ALL {
            agents.insert(role.id().to_string(), self.agents().get(role).core().model().await);
        }
        HealthReport {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            agents,
        }
    }

    /// Status of every agent in pipeline order.
    pub async fn agent_statuses(&self) -> Vec<AgentStatus> {
        let mut statuses = Vec::with_capacity(AgentRole::ALL.len());
        for role in AgentRole::ALL {
            statuses.push(self.agents().get(role).core().status().await);
        }
        statuses
    }

    /// Metrics for one agent.
    pub async fn agent_metrics(&self, role: AgentRole) -> AgentMetrics {
        self.agents().get(role).core().metrics().await
    }

    /// Human (X) move.
    pub async fn human_move(&self, row: usize, col: usize) -> Result<(Move, GameSnapshot), SessionError> {
        self.session.play(row, col, HUMAN).await
    }

    /// Lets the agents choose and play O's move.
    ///
    /// The game lock is not held while agents run; if the board changed in
    /// the meantime the move is refused with [`SessionError::StaleDecision`].
    /// A coordination timeout or agent error falls back to the heuristic.
    #[instrument(skip(self))]
    pub async fn ai_move(&self) -> Result<AiMove, SessionError> {
        match self.session.current_player().await {
            None => return Err(MoveError::GameOver.into()),
            Some(player) if player != AI => {
                return Err(MoveError::WrongTurn {
                    expected: player,
                    attempted: AI,
                }
                .into());
            }
            Some(_) => {}
        }

        let board = self.session.board().await;
        let started = Instant::now();
        let budget = Duration::from_secs(*self.config.performance().mcp_coordination_timeout());

        let decision = match tokio::time::timeout(budget, self.coordinator.decide(&board, AI)).await {
            Ok(Ok(decision)) => decision,
            outcome => {
                let reason = match outcome {
                    Ok(Err(e)) => e.to_string(),
                    _ => format!("coordination exceeded {budget:?}"),
                };
                warn!(%reason, "Coordinator failed, using heuristic move");
                let (pos, rule) = heuristic_move(&board, AI).ok_or(MoveError::GameOver)?;
                self.log
                    .record("coordinator", "heuristic_fallback", json!({ "reason": reason, "rule": rule }))
                    .await;
                Decision {
                    cell: pos.into(),
                    path: DecisionPath::Heuristic,
                    observation: Some(Observation::scan(&board, AI)),
                    plan: None,
                    execution: None,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }
            }
        };

        let (mv, game) = self
            .session
            .play_decided(decision.cell.row, decision.cell.col, AI, &board)
            .await?;
        info!(cell = %decision.cell, path = %decision.path, "AI move played");
        Ok(AiMove { mv, decision, game })
    }

    /// Resets the game and clears the protocol log.
    pub async fn reset(&self) -> GameSnapshot {
        self.log.clear().await;
        self.session.reset().await
    }

    /// Hot-swaps `role` onto registry model `model`.
    ///
    /// # Errors
    ///
    /// Unknown model names and missing credentials are refused; the agent
    /// keeps its current model.
    #[instrument(skip(self))]
    pub async fn switch_model(&self, role: AgentRole, model: &str) -> Result<ModelSwitch, RegistryError> {
        let client = self.registry.build_client(model, &self.credentials)?;
        let backend = Arc::new(client) as Arc<dyn CompletionBackend>;
        let old_model = self.agents().get(role).core().switch_model(model, Some(backend)).await;
        self.log
            .record(role.id(), "switch_model", json!({ "old_model": old_model, "new_model": model }))
            .await;
        Ok(ModelSwitch {
            success: true,
            agent_id: role.id().to_string(),
            old_model,
            new_model: model.to_string(),
        })
    }
}
