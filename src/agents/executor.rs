//! Executor: commits to the move the Strategist recommended.

use super::args::{ExecuteMoveArgs, MoveArgs, parse_args, resolve_board, resolve_player, to_json};
use super::strategist::{Plan, heuristic_move};
use super::{
    Agent, AgentCore, AgentError, Cell, Placeholder, PromptSpec, ToolError,
    describe_board, extract_json, extract_move, format_cells, schema_of,
};
use async_trait::async_trait;
use rmcp::model::Tool;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tictactoe_core::{Board, Player, check_winner};
use tracing::{debug, info, instrument, warn};

const SYSTEM_PROMPT: &str = "You are the Executor in a tic-tac-toe team. You double-check the \
Strategist's move and commit to it unless it is clearly illegal or clearly loses. Reply with JSON only.";

const EXECUTION: &str = "You play {player}.

{board}
Recommended move: {recommended_move}
Strategist's reasoning: {reasoning}
Available moves: {available_moves}

Confirm the recommended move or replace it with a better available one. Reply as JSON:
{\"move\": [row, col], \"reasoning\": \"<one sentence>\"}";

const VALIDATION: &str = "Is {cell} a legal move on this board? Rows and columns run 0 to 2 and the \
cell must be empty.

{board}
Answer \"valid\" or \"invalid\" with a short reason.";

/// How the Executor arrived at its cell.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The model confirmed the recommendation.
    #[display("confirmed")]
    Confirmed,
    /// The model picked a different available cell.
    #[display("overridden")]
    Overridden,
    /// The model failed; the recommendation was used as-is.
    #[display("recommended_fallback")]
    RecommendedFallback,
    /// Neither the model nor the recommendation gave a legal cell.
    #[display("first_empty_fallback")]
    FirstEmptyFallback,
}

/// The committed move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Cell to play.
    pub cell: Cell,
    /// How it was chosen.
    pub status: ExecutionStatus,
    /// Why.
    pub reasoning: String,
    /// Whether the model's answer was not used.
    pub fallback_used: bool,
}

/// Result of [`validate_move`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveValidation {
    /// The cell checked.
    pub cell: Cell,
    /// Whether it can be played.
    pub valid: bool,
    /// Why not, or `"ok"`.
    pub reason: String,
}

/// Checks that `cell` is on the board, empty, and the game is not over.
pub fn validate_move(board: &Board, cell: Cell) -> MoveValidation {
    let verdict = |valid: bool, reason: &str| MoveValidation {
        cell,
        valid,
        reason: reason.to_string(),
    };
    let Some(pos) = cell.position() else {
        return verdict(false, "out of bounds: row and col must be 0-2");
    };
    if check_winner(board).is_some() {
        return verdict(false, "game is already won");
    }
    if !board.is_empty(pos) {
        return verdict(false, "square is already occupied");
    }
    verdict(true, "ok")
}

/// Execution agent.
#[derive(Debug)]
pub struct Executor {
    core: AgentCore,
}

impl Executor {
    /// Wraps `core`.
    pub fn new(core: AgentCore) -> Self {
        Self { core }
    }

    /// Commits to a cell for `player`.
    ///
    /// The model may confirm or replace `plan.recommended_move`. An answer
    /// that is not an empty cell is ignored in favour of the recommendation;
    /// if that is not playable either, the first empty cell is used.
    ///
    /// # Errors
    ///
    /// [`AgentError::NoMovesAvailable`] on a full board.
    #[instrument(skip_all, fields(player = %player, recommended = %plan.recommended_move))]
    pub async fn execute_move(&self, plan: &Plan, board: &Board, player: Player) -> Result<Execution, AgentError> {
        let available: Vec<Cell> = board.empty_positions().into_iter().map(Cell::from).collect();
        let Some(first_empty) = available.first().copied() else {
            return Err(AgentError::NoMovesAvailable);
        };

        let args = BTreeMap::from([
            ("board".to_string(), describe_board(board)),
            ("player".to_string(), player.to_string()),
            ("recommended_move".to_string(), plan.recommended_move.to_string()),
            ("reasoning".to_string(), plan.reasoning.clone()),
            ("available_moves".to_string(), format_cells(&available)),
        ]);

        let failure = match execution_prompt().render(&args) {
            Ok(user) => match self.core.complete(SYSTEM_PROMPT, &user).await {
                Ok(completion) => match extract_move(&completion.content) {
                    Some(cell) if available.contains(&cell) => {
                        let status = if cell == plan.recommended_move {
                            ExecutionStatus::Confirmed
                        } else {
                            ExecutionStatus::Overridden
                        };
                        let reasoning = extract_json(&completion.content)
                            .and_then(|json| json.get("reasoning").and_then(Value::as_str).map(str::to_string))
                            .unwrap_or_else(|| plan.reasoning.clone());
                        info!(%cell, %status, "Move executed");
                        return Ok(Execution {
                            cell,
                            status,
                            reasoning,
                            fallback_used: false,
                        });
                    }
                    Some(cell) => format!("model chose unavailable cell {cell}"),
                    None => "model reply had no move".to_string(),
                },
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        warn!(reason = %failure, "Executor falling back");
        self.core.record_fallback().await;

        if available.contains(&plan.recommended_move) {
            return Ok(Execution {
                cell: plan.recommended_move,
                status: ExecutionStatus::RecommendedFallback,
                reasoning: format!("{} ({failure})", plan.reasoning),
                fallback_used: true,
            });
        }

        debug!("Recommended move is not playable either");
        Ok(Execution {
            cell: first_empty,
            status: ExecutionStatus::FirstEmptyFallback,
            reasoning: format!("first empty cell; recommendation {} unavailable", plan.recommended_move),
            fallback_used: true,
        })
    }
}

fn execution_prompt() -> PromptSpec {
    PromptSpec {
        name: "execution",
        description: "Confirm or replace the Strategist's move",
        arguments: vec![
            Placeholder::required("board", "Board grid with coordinates"),
            Placeholder::required("player", "Mark to play"),
            Placeholder::required("recommended_move", "Strategist's move as (row, col)"),
            Placeholder::optional("reasoning", "Strategist's reasoning"),
            Placeholder::required("available_moves", "Empty cells"),
        ],
        template: EXECUTION,
    }
}

fn validation_prompt() -> PromptSpec {
    PromptSpec {
        name: "validation",
        description: "Ask whether a cell is a legal move",
        arguments: vec![
            Placeholder::required("board", "Board grid with coordinates"),
            Placeholder::required("cell", "Cell as (row, col)"),
        ],
        template: VALIDATION,
    }
}

#[async_trait]
impl Agent for Executor {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "execute_move",
                "Commit to a move for a board. Does not change the live game",
                schema_of::<ExecuteMoveArgs>(),
            ),
            Tool::new(
                "validate_move",
                "Check whether a cell can be played",
                schema_of::<MoveArgs>(),
            ),
        ]
    }

    fn prompts(&self) -> Vec<PromptSpec> {
        vec![execution_prompt(), validation_prompt()]
    }

    #[instrument(skip(self, arguments, current))]
    async fn call_tool(&self, name: &str, arguments: Value, current: &Board) -> Result<Value, ToolError> {
        match name {
            "execute_move" => {
                let args: ExecuteMoveArgs = parse_args(arguments)?;
                let board = resolve_board(args.board.as_deref(), current)?;
                let player = resolve_player(args.player.as_deref(), &board)?;
                let plan = match args.recommended_move {
                    Some(cell) => Plan {
                        recommended_move: cell,
                        strategy: "requested".to_string(),
                        reasoning: "move supplied by caller".to_string(),
                        confidence: 0.5,
                        fallback_used: false,
                    },
                    None => {
                        let (pos, rule) = heuristic_move(&board, player).ok_or_else(|| ToolError::Failed {
                            message: AgentError::NoMovesAvailable.to_string(),
                        })?;
                        Plan {
                            recommended_move: pos.into(),
                            strategy: rule.to_string(),
                            reasoning: format!("heuristic {rule}"),
                            confidence: 0.5,
                            fallback_used: true,
                        }
                    }
                };
                let execution = self
                    .execute_move(&plan, &board, player)
                    .await
                    .map_err(|e| ToolError::Failed { message: e.to_string() })?;
                to_json(&execution)
            }
            "validate_move" => {
                let args: MoveArgs = parse_args(arguments)?;
                let board = resolve_board(args.board.as_deref(), current)?;
                to_json(&validate_move(&board, Cell::new(args.row, args.col)))
            }
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}
