//! The three cooperating agents and what they share.
//!
//! Each agent pairs prompt templates with one LLM call and a deterministic
//! fallback, and exposes named tools and prompts for the JSON-RPC facade.

mod args;
mod base;
mod executor;
mod parse;
mod registry;
mod scout;
mod strategist;

pub use args::{BoardArgs, MoveArgs, ExecuteMoveArgs, board_from_rows, schema_of};
pub use base::{AgentCore, AgentError, AgentStatus};
pub use executor::{Execution, ExecutionStatus, Executor, MoveValidation, validate_move};
pub use parse::{extract_json, extract_move};
pub use registry::{Placeholder, PromptSpec, ToolError};
pub use scout::{GamePhase, Observation, PatternAnalysis, Scout, pattern_analysis};
pub use strategist::{
    Plan, PositionEvaluation, Strategist, WinProbability, assess_win_probability,
    evaluate_position, heuristic_move,
};

use async_trait::async_trait;
use rmcp::model::Tool;
use derive_more::Display;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tictactoe_core::{Board, Player, Position};

/// Which of the three agents.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Reads the board.
    #[display("scout")]
    Scout,
    /// Plans a move.
    #[display("strategist")]
    Strategist,
    /// Commits to a move.
    #[display("executor")]
    Executor,
}

impl AgentRole {
    /// All roles in pipeline order.
    pub const ALL: [AgentRole; 3] = [AgentRole::Scout, AgentRole::Strategist, AgentRole::Executor];

    /// Stable id used in URLs and logs.
    pub fn id(self) -> &'static str {
        match self {
            AgentRole::Scout => "scout",
            AgentRole::Strategist => "strategist",
            AgentRole::Executor => "executor",
        }
    }

    /// Parses an id (case-insensitive).
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.id().eq_ignore_ascii_case(id.trim()))
    }

    /// Human-readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            AgentRole::Scout => "Scout",
            AgentRole::Strategist => "Strategist",
            AgentRole::Executor => "Executor",
        }
    }

    /// One line on what the agent does.
    pub fn description(self) -> &'static str {
        match self {
            AgentRole::Scout => "Reads the board: threats, opportunities and patterns",
            AgentRole::Strategist => "Plans the next move from the Scout's observation",
            AgentRole::Executor => "Validates and commits the Strategist's move",
        }
    }
}

/// A board cell as `(row, col)` on the wire.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[display("({row}, {col})")]
pub struct Cell {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
}

impl Cell {
    /// Creates a cell.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The board position, when in range.
    pub fn position(self) -> Option<Position> {
        Position::from_row_col(self.row, self.col)
    }
}

impl From<Position> for Cell {
    fn from(pos: Position) -> Self {
        Self::new(pos.row(), pos.col())
    }
}

/// Behaviour shared by Scout, Strategist and Executor for the facade.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Shared state: model slot, metrics, timeout.
    fn core(&self) -> &AgentCore;

    /// Agent-specific tools.
    fn tools(&self) -> Vec<Tool>;

    /// Prompt templates this agent renders.
    fn prompts(&self) -> Vec<PromptSpec>;

    /// Runs an agent-specific tool. `current` is the live board, used when
    /// the arguments carry none.
    async fn call_tool(&self, name: &str, arguments: Value, current: &Board) -> Result<Value, ToolError>;

    /// Looks up a prompt template by name.
    fn prompt(&self, name: &str) -> Option<PromptSpec> {
        self.prompts().into_iter().find(|p| p.name == name)
    }
}

/// The three agents, shared between the coordinator and the facade.
#[derive(Clone)]
pub struct AgentSet {
    /// Board analysis.
    pub scout: Arc<Scout>,
    /// Planning.
    pub strategist: Arc<Strategist>,
    /// Execution.
    pub executor: Arc<Executor>,
}

impl AgentSet {
    /// Bundles the three agents.
    pub fn new(scout: Scout, strategist: Strategist, executor: Executor) -> Self {
        Self {
            scout: Arc::new(scout),
            strategist: Arc::new(strategist),
            executor: Arc::new(executor),
        }
    }

    /// The agent for `role`.
    pub fn get(&self, role: AgentRole) -> Arc<dyn Agent> {
        match role {
            AgentRole::Scout => self.scout.clone() as Arc<dyn Agent>,
            AgentRole::Strategist => self.strategist.clone() as Arc<dyn Agent>,
            AgentRole::Executor => self.executor.clone() as Arc<dyn Agent>,
        }
    }
}

/// Cells as `(r, c), (r, c)` for prompts; `none` when empty.
pub fn format_cells(cells: &[Cell]) -> String {
    if cells.is_empty() {
        return "none".to_string();
    }
    cells.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Board as a coordinate grid for prompts.
pub fn describe_board(board: &Board) -> String {
    let mut out = String::from("    0   1   2\n");
    for (r, row) in board.rows().iter().enumerate() {
        let marks: Vec<String> = row
            .iter()
            .map(|cell| cell.map_or(".".to_string(), |p| p.to_string()))
            .collect();
        out.push_str(&format!("{}   {}\n", r, marks.join(" | ")));
    }
    out
}

/// The side to move on `board` if it were unconstrained: X when counts are equal.
pub fn side_to_move(board: &Board) -> Player {
    if board.count(Player::X) == board.count(Player::O) {
        Player::X
    } else {
        Player::O
    }
}
