//! State every agent carries: the swappable model, metrics and call timeout.

use super::AgentRole;
use crate::llm_client::{Completion, CompletionBackend, LlmError};
use crate::metrics::AgentMetrics;
use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Why an agent could not produce an LLM answer.
///
/// Callers treat every variant the same way: fall back to the heuristic.
#[derive(Debug, Display, Error, From)]
pub enum AgentError {
    /// No model is configured (missing credentials at startup).
    #[display("{agent} has no language model configured")]
    Unavailable {
        /// Agent without a model.
        agent: AgentRole,
    },
    /// The call exceeded the per-call timeout.
    #[display("{agent} timed out after {after:?}")]
    Timeout {
        /// Agent that timed out.
        agent: AgentRole,
        /// Configured timeout.
        after: Duration,
    },
    /// The provider returned an error.
    #[display("{_0}")]
    #[from]
    Llm(LlmError),
    /// The board has no empty cell.
    #[display("No moves available")]
    NoMovesAvailable,
}

struct ModelSlot {
    model: String,
    backend: Option<Arc<dyn CompletionBackend>>,
}

/// Summary shown by `/agents/status` and the `get_status` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    /// Agent id.
    pub agent_id: String,
    /// Human-readable name.
    pub name: String,
    /// Model name in use.
    pub model: String,
    /// Whether a model client is attached. Without one the agent runs on heuristics.
    pub llm_available: bool,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

/// Shared agent internals.
pub struct AgentCore {
    role: AgentRole,
    slot: RwLock<ModelSlot>,
    metrics: RwLock<AgentMetrics>,
    timeout: Duration,
    metrics_enabled: bool,
}

impl std::fmt::Debug for AgentCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCore")
            .field("role", &self.role)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AgentCore {
    /// Creates the core for `role`. `backend` is `None` when no model could be built.
    #[instrument(skip(backend), fields(role = %role, has_backend = backend.is_some()))]
    pub fn new(
        role: AgentRole,
        model: impl Into<String> + std::fmt::Debug,
        backend: Option<Arc<dyn CompletionBackend>>,
        timeout: Duration,
    ) -> Self {
        let model = model.into();
        if backend.is_none() {
            warn!(%model, "Agent starting without a language model, heuristics only");
        }
        Self {
            role,
            metrics: RwLock::new(AgentMetrics::new(role.id(), model.clone())),
            slot: RwLock::new(ModelSlot { model, backend }),
            timeout,
            metrics_enabled: true,
        }
    }

    /// Turns metric recording on or off.
    pub fn with_metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Which agent this is.
    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Current model name.
    pub async fn model(&self) -> String {
        self.slot.read().await.model.clone()
    }

    /// Whether a model client is attached.
    pub async fn llm_available(&self) -> bool {
        self.slot.read().await.backend.is_some()
    }

    /// Status summary.
    pub async fn status(&self) -> AgentStatus {
        let slot = self.slot.read().await;
        AgentStatus {
            agent_id: self.role.id().to_string(),
            name: self.role.display_name().to_string(),
            model: slot.model.clone(),
            llm_available: slot.backend.is_some(),
            timeout_secs: self.timeout.as_secs(),
        }
    }

    /// Snapshot of the metrics.
    pub async fn metrics(&self) -> AgentMetrics {
        self.metrics.read().await.clone()
    }

    /// Zeroes the metrics.
    #[instrument(skip(self), fields(role = %self.role))]
    pub async fn reset_metrics(&self) {
        self.metrics.write().await.reset();
        info!("Metrics reset");
    }

    /// Counts a decision where the heuristic replaced the model.
    pub async fn record_fallback(&self) {
        if self.metrics_enabled {
            self.metrics.write().await.record_fallback();
        }
    }

    /// Swaps the model; returns the previous model name.
    ///
    /// Accumulated counters are kept; later records carry the new name.
    #[instrument(skip(self, backend), fields(role = %self.role))]
    pub async fn switch_model(
        &self,
        model: impl Into<String> + std::fmt::Debug,
        backend: Option<Arc<dyn CompletionBackend>>,
    ) -> String {
        let model = model.into();
        let old = {
            let mut slot = self.slot.write().await;
            slot.backend = backend;
            std::mem::replace(&mut slot.model, model.clone())
        };
        self.metrics.write().await.set_model(model.clone());
        info!(old_model = %old, new_model = %model, "Model switched");
        old
    }

    /// One LLM call bounded by the agent timeout, recorded in metrics.
    #[instrument(skip(self, system_prompt, user_message), fields(role = %self.role))]
    pub async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<Completion, AgentError> {
        let backend = self.slot.read().await.backend.clone();
        let Some(backend) = backend else {
            debug!("No backend attached");
            return Err(AgentError::Unavailable { agent: self.role });
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, backend.complete(system_prompt, user_message)).await;
        let elapsed = started.elapsed();

        let result = match outcome {
            Ok(Ok(completion)) => {
                debug!(tokens = completion.tokens, elapsed_ms = elapsed.as_millis() as u64, "Completion received");
                if self.metrics_enabled {
                    self.metrics.write().await.record_success(elapsed, completion.tokens);
                }
                return Ok(completion);
            }
            Ok(Err(e)) => AgentError::Llm(e),
            Err(_) => AgentError::Timeout {
                agent: self.role,
                after: self.timeout,
            },
        };

        warn!(error = %result, "LLM call failed");
        if self.metrics_enabled {
            self.metrics.write().await.record_failure(elapsed);
        }
        Err(result)
    }
}
