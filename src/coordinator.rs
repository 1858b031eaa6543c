//! Runs the three agents in order to choose the AI's move.

use crate::agents::{AgentError, AgentSet, Cell, Execution, Observation, Plan};
use crate::protocol_log::ProtocolLog;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tictactoe_core::{Board, Player};
use tracing::{info, instrument};

/// Which branch produced the move.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPath {
    /// The Scout found a winning cell.
    #[display("immediate_win")]
    ImmediateWin,
    /// The Scout found an opponent winning cell to block.
    #[display("immediate_block")]
    ImmediateBlock,
    /// Strategist then Executor.
    #[display("pipeline")]
    Pipeline,
    /// The whole decision timed out and the heuristic chose.
    #[display("heuristic")]
    Heuristic,
}

/// The AI's chosen move with the outputs that led to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Cell to play.
    pub cell: Cell,
    /// Branch taken.
    pub path: DecisionPath,
    /// Scout output. `None` only on the heuristic path.
    pub observation: Option<Observation>,
    /// Strategist output on the pipeline path.
    pub plan: Option<Plan>,
    /// Executor output on the pipeline path.
    pub execution: Option<Execution>,
    /// Wall time for the decision.
    pub elapsed_ms: u64,
}

/// Scout, then win or block short-circuits, then Strategist and Executor.
#[derive(Clone)]
pub struct Coordinator {
    agents: AgentSet,
    log: Arc<ProtocolLog>,
}

impl Coordinator {
    /// Coordinates `agents`, recording each step in `log`.
    pub fn new(agents: AgentSet, log: Arc<ProtocolLog>) -> Self {
        Self { agents, log }
    }

    /// The agents.
    pub fn agents(&self) -> &AgentSet {
        &self.agents
    }

    /// The protocol log.
    pub fn log(&self) -> &Arc<ProtocolLog> {
        &self.log
    }

    /// Chooses a move for `ai` on `board`.
    ///
    /// # Errors
    ///
    /// [`AgentError::NoMovesAvailable`] when the board is full.
    #[instrument(skip(self, board), fields(ai = %ai, moves = board.occupied()))]
    pub async fn decide(&self, board: &Board, ai: Player) -> Result<Decision, AgentError> {
        let started = Instant::now();
        if board.empty_positions().is_empty() {
            return Err(AgentError::NoMovesAvailable);
        }

        let observation = self.agents.scout.analyze_board(board, ai).await;
        self.log
            .record(
                "scout",
                "analyze_board",
                json!({
                    "player": ai,
                    "threats": observation.threats,
                    "opportunities": observation.opportunities,
                    "fallback_used": observation.fallback_used,
                }),
            )
            .await;

        let short_circuit = observation
            .opportunities
            .first()
            .map(|cell| (*cell, DecisionPath::ImmediateWin))
            .or_else(|| observation.threats.first().map(|cell| (*cell, DecisionPath::ImmediateBlock)));

        if let Some((cell, path)) = short_circuit {
            self.log
                .record("coordinator", &path.to_string(), json!({ "cell": cell }))
                .await;
            info!(%cell, %path, "Short-circuit decision");
            return Ok(Decision {
                cell,
                path,
                observation: Some(observation),
                plan: None,
                execution: None,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        let plan = self.agents.strategist.create_strategy(&observation, board).await?;
        self.log
            .record(
                "strategist",
                "create_strategy",
                json!({
                    "recommended_move": plan.recommended_move,
                    "strategy": plan.strategy,
                    "confidence": plan.confidence,
                    "fallback_used": plan.fallback_used,
                }),
            )
            .await;

        let execution = self.agents.executor.execute_move(&plan, board, ai).await?;
        self.log
            .record(
                "executor",
                "execute_move",
                json!({
                    "cell": execution.cell,
                    "status": execution.status,
                    "fallback_used": execution.fallback_used,
                }),
            )
            .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(cell = %execution.cell, status = %execution.status, elapsed_ms, "Pipeline decision");
        Ok(Decision {
            cell: execution.cell,
            path: DecisionPath::Pipeline,
            observation: Some(observation),
            plan: Some(plan),
            execution: Some(execution),
            elapsed_ms,
        })
    }
}
