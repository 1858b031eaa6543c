//! Strategist: turns an observation into a recommended move.

use super::args::{BoardArgs, parse_args, resolve_board, resolve_player, to_json};
use super::scout::{Observation, PatternAnalysis, open_lines, pattern_analysis};
use super::{
    Agent, AgentCore, AgentError, Cell, Placeholder, PromptSpec, ToolError,
    describe_board, extract_json, extract_move, format_cells, schema_of, side_to_move,
};
use async_trait::async_trait;
use rmcp::model::Tool;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tictactoe_core::{Board, Player, Position, Square, check_winner, is_full, winning_cells};
use tracing::{debug, info, instrument, warn};

const SYSTEM_PROMPT: &str = "You are the Strategist in a tic-tac-toe team. Given the Scout's report \
you choose the single best move. Always win when you can, otherwise block the opponent's immediate \
win. Reply with JSON only.";

const STRATEGY: &str = "You play {player}.

{board}
Scout report: {analysis}
Your immediate wins: {opportunities}
Opponent's immediate wins (block these): {threats}
Available moves: {available_moves}

Choose one available move. Reply as JSON:
{\"move\": [row, col], \"strategy\": \"<one word>\", \"reasoning\": \"<one sentence>\", \"confidence\": <0.0-1.0>}";

const MOVE_RECOMMENDATION: &str = "You play {player}. Pick the best move on this board.

{board}
Available moves: {available_moves}

Answer with the move as [row, col] and nothing else.";

/// The Strategist's recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Cell to play.
    pub recommended_move: Cell,
    /// Short label: `win`, `block`, `center`, `corner`, `edge` or the model's own.
    pub strategy: String,
    /// Why.
    pub reasoning: String,
    /// 0.0 to 1.0.
    pub confidence: f32,
    /// Whether the heuristic chose the move.
    pub fallback_used: bool,
}

/// Win, then block, then center, then corners, then edges.
///
/// Returns the cell with the name of the rule that picked it, or `None` on a
/// full board.
#[instrument(skip(board))]
pub fn heuristic_move(board: &Board, player: Player) -> Option<(Position, &'static str)> {
    if let Some(pos) = winning_cells(board, player).first() {
        return Some((*pos, "win"));
    }
    if let Some(pos) = winning_cells(board, player.opponent()).first() {
        return Some((*pos, "block"));
    }
    if board.is_empty(Position::Center) {
        return Some((Position::Center, "center"));
    }
    if let Some(pos) = Position::CORNERS.into_iter().find(|p| board.is_empty(*p)) {
        return Some((pos, "corner"));
    }
    Position::EDGES
        .into_iter()
        .find(|p| board.is_empty(*p))
        .map(|pos| (pos, "edge"))
}

fn heuristic_plan(board: &Board, player: Player, note: Option<&str>) -> Option<Plan> {
    let (pos, rule) = heuristic_move(board, player)?;
    let (confidence, why) = match rule {
        "win" => (1.0, "completes a line"),
        "block" => (0.9, "blocks the opponent's immediate win"),
        "center" => (0.7, "takes the center, which sits on four lines"),
        "corner" => (0.6, "takes a corner, which sits on three lines"),
        _ => (0.5, "takes the only kind of square left"),
    };
    let mut reasoning = format!("{} {}", Cell::from(pos), why);
    if let Some(note) = note {
        reasoning = format!("{reasoning} ({note})");
    }
    Some(Plan {
        recommended_move: pos.into(),
        strategy: rule.to_string(),
        reasoning,
        confidence,
        fallback_used: true,
    })
}

/// Static evaluation of a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEvaluation {
    /// Side evaluated for.
    pub player: Player,
    /// Positive favours `player`.
    pub score: i32,
    /// `won`, `lost`, `drawn`, `winning`, `favorable`, `balanced`, `unfavorable` or `losing`.
    pub assessment: String,
    /// Structural features behind the score.
    pub patterns: PatternAnalysis,
}

/// Scores the position for `player` from open lines, center, corners and immediate wins.
#[instrument(skip(board))]
pub fn evaluate_position(board: &Board, player: Player) -> PositionEvaluation {
    let patterns = pattern_analysis(board);
    let opponent = player.opponent();

    let (score, assessment) = match check_winner(board) {
        Some(winner) if winner == player => (100, "won"),
        Some(_) => (-100, "lost"),
        None if is_full(board) => (0, "drawn"),
        None => {
            let corners = |p| {
                Position::CORNERS
                    .iter()
                    .filter(|pos| board.get(**pos) == Square::Occupied(p))
                    .count() as i32
            };
            let mut score = 3 * (open_lines(board, player) as i32 - open_lines(board, opponent) as i32);
            score += match patterns.center {
                Some(p) if p == player => 4,
                Some(_) => -4,
                None => 0,
            };
            score += 2 * (corners(player) - corners(opponent));
            let own_wins = winning_cells(board, player).len();
            let their_wins = winning_cells(board, opponent).len();
            let to_move = side_to_move(board);
            if own_wins > 0 && (to_move == player || own_wins >= 2) {
                score += 25;
            }
            if their_wins > 0 && (to_move == opponent || their_wins >= 2) {
                score -= 25;
            }
            let label = match score {
                s if s >= 20 => "winning",
                s if s >= 5 => "favorable",
                s if s > -5 => "balanced",
                s if s > -20 => "unfavorable",
                _ => "losing",
            };
            (score, label)
        }
    };

    PositionEvaluation {
        player,
        score,
        assessment: assessment.to_string(),
        patterns,
    }
}

/// Rough outcome odds for `player`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinProbability {
    /// Side assessed.
    pub player: Player,
    /// Chance of winning.
    pub win: f32,
    /// Chance of a draw.
    pub draw: f32,
    /// Chance of losing.
    pub loss: f32,
    /// Which rule produced the numbers.
    pub basis: String,
}

/// Estimates outcome odds from immediate wins, forks and the static score.
#[instrument(skip(board))]
pub fn assess_win_probability(board: &Board, player: Player) -> WinProbability {
    let odds = |win: f32, draw: f32, loss: f32, basis: &str| WinProbability {
        player,
        win,
        draw,
        loss,
        basis: basis.to_string(),
    };

    match check_winner(board) {
        Some(winner) if winner == player => return odds(1.0, 0.0, 0.0, "game won"),
        Some(_) => return odds(0.0, 0.0, 1.0, "game lost"),
        None if is_full(board) => return odds(0.0, 1.0, 0.0, "game drawn"),
        None => {}
    }

    let to_move = side_to_move(board);
    let own_wins = winning_cells(board, player).len();
    let their_wins = winning_cells(board, player.opponent()).len();

    if to_move == player && own_wins > 0 {
        return odds(0.95, 0.05, 0.0, "immediate win available");
    }
    if to_move != player && their_wins > 0 {
        return odds(0.0, 0.05, 0.95, "opponent has an immediate win");
    }
    if to_move == player && their_wins >= 2 {
        return odds(0.0, 0.15, 0.85, "opponent fork cannot be fully blocked");
    }

    let score = evaluate_position(board, player).score as f32 / 100.0;
    let win = (0.3 + score).clamp(0.05, 0.85);
    let loss = (0.3 - score).clamp(0.05, 0.85);
    let draw = (1.0 - win - loss).max(0.0);
    odds(win, draw, loss, "static evaluation")
}

/// Planning agent.
#[derive(Debug)]
pub struct Strategist {
    core: AgentCore,
}

#[derive(Debug, Default, Deserialize)]
struct ModelPlan {
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

impl Strategist {
    /// Wraps `core`.
    pub fn new(core: AgentCore) -> Self {
        Self { core }
    }

    /// Chooses a move for `observation.player`.
    ///
    /// The model's move is used only when it names an available cell;
    /// otherwise the win/block/center/corner/edge heuristic decides.
    ///
    /// # Errors
    ///
    /// [`AgentError::NoMovesAvailable`] on a full board.
    #[instrument(skip_all, fields(player = %observation.player))]
    pub async fn create_strategy(&self, observation: &Observation, board: &Board) -> Result<Plan, AgentError> {
        if observation.available_moves.is_empty() {
            return Err(AgentError::NoMovesAvailable);
        }

        let args = BTreeMap::from([
            ("board".to_string(), describe_board(board)),
            ("player".to_string(), observation.player.to_string()),
            ("analysis".to_string(), observation.analysis.clone()),
            ("opportunities".to_string(), format_cells(&observation.opportunities)),
            ("threats".to_string(), format_cells(&observation.threats)),
            ("available_moves".to_string(), format_cells(&observation.available_moves)),
        ]);

        let note = match strategy_prompt().render(&args) {
            Ok(user) => match self.core.complete(SYSTEM_PROMPT, &user).await {
                Ok(completion) => match self.plan_from_reply(&completion.content, observation) {
                    Some(plan) => {
                        info!(cell = %plan.recommended_move, strategy = %plan.strategy, "Model plan accepted");
                        return Ok(plan);
                    }
                    None => "model reply had no available move".to_string(),
                },
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        warn!(reason = %note, "Strategist falling back to heuristic");
        self.core.record_fallback().await;
        heuristic_plan(board, observation.player, Some(&note)).ok_or(AgentError::NoMovesAvailable)
    }

    fn plan_from_reply(&self, reply: &str, observation: &Observation) -> Option<Plan> {
        let cell = extract_move(reply)?;
        if !observation.available_moves.contains(&cell) {
            debug!(%cell, "Model proposed an unavailable cell");
            return None;
        }
        let fields: ModelPlan = extract_json(reply)
            .and_then(|json| serde_json::from_value(json).ok())
            .unwrap_or_default();
        let reasoning = fields.reasoning.unwrap_or_else(|| reply.trim().chars().take(400).collect());
        Some(Plan {
            recommended_move: cell,
            strategy: fields.strategy.unwrap_or_else(|| "model".to_string()),
            reasoning,
            confidence: fields.confidence.unwrap_or(0.6).clamp(0.0, 1.0),
            fallback_used: false,
        })
    }
}

fn strategy_prompt() -> PromptSpec {
    PromptSpec {
        name: "strategy",
        description: "Full planning prompt built from the Scout's observation",
        arguments: vec![
            Placeholder::required("board", "Board grid with coordinates"),
            Placeholder::required("player", "Mark to play"),
            Placeholder::optional("analysis", "Scout narrative"),
            Placeholder::optional("opportunities", "Immediate wins"),
            Placeholder::optional("threats", "Opponent's immediate wins"),
            Placeholder::required("available_moves", "Empty cells"),
        ],
        template: STRATEGY,
    }
}

fn move_recommendation_prompt() -> PromptSpec {
    PromptSpec {
        name: "move_recommendation",
        description: "Short prompt asking for a single move",
        arguments: vec![
            Placeholder::required("board", "Board grid with coordinates"),
            Placeholder::required("player", "Mark to play"),
            Placeholder::required("available_moves", "Empty cells"),
        ],
        template: MOVE_RECOMMENDATION,
    }
}

#[async_trait]
impl Agent for Strategist {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn tools(&self) -> Vec<Tool> {
        let schema = schema_of::<BoardArgs>();
        vec![
            Tool::new(
                "create_strategy",
                "Full plan (move, strategy, reasoning, confidence) for a position",
                schema.clone(),
            ),
            Tool::new(
                "evaluate_position",
                "Static score and assessment of a position",
                schema.clone(),
            ),
            Tool::new("recommend_move", "Just the recommended move and why", schema.clone()),
            Tool::new("assess_win_probability", "Estimated win/draw/loss odds", schema),
        ]
    }

    fn prompts(&self) -> Vec<PromptSpec> {
        vec![strategy_prompt(), move_recommendation_prompt()]
    }

    #[instrument(skip(self, arguments, current))]
    async fn call_tool(&self, name: &str, arguments: Value, current: &Board) -> Result<Value, ToolError> {
        let args: BoardArgs = parse_args(arguments)?;
        let board = resolve_board(args.board.as_deref(), current)?;
        let player = resolve_player(args.player.as_deref(), &board)?;

        match name {
            "create_strategy" | "recommend_move" => {
                let mut observation = Observation::scan(&board, player);
                observation.analysis = "not requested".to_string();
                let plan = self
                    .create_strategy(&observation, &board)
                    .await
                    .map_err(|e| ToolError::Failed { message: e.to_string() })?;
                if name == "create_strategy" {
                    to_json(&plan)
                } else {
                    Ok(json!({
                        "recommended_move": plan.recommended_move,
                        "reasoning": plan.reasoning,
                        "confidence": plan.confidence,
                        "fallback_used": plan.fallback_used,
                    }))
                }
            }
            "evaluate_position" => to_json(&evaluate_position(&board, player)),
            "assess_win_probability" => to_json(&assess_win_probability(&board, player)),
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(marks: &[(Position, Player)]) -> Board {
        let mut board = Board::new();
        for (pos, player) in marks {
            board.set(*pos, Square::Occupied(*player));
        }
        board
    }

    #[test]
    fn test_heuristic_priority() {
        assert_eq!(heuristic_move(&Board::new(), Player::X), Some((Position::Center, "center")));

        let center_taken = board(&[(Position::Center, Player::X)]);
        assert_eq!(heuristic_move(&center_taken, Player::O), Some((Position::TopLeft, "corner")));

        // O can win on the middle row and must also block X's top row: win first.
        let both = board(&[
            (Position::TopLeft, Player::X),
            (Position::TopCenter, Player::X),
            (Position::MiddleLeft, Player::O),
            (Position::Center, Player::O),
            (Position::BottomRight, Player::X),
        ]);
        assert_eq!(heuristic_move(&both, Player::O), Some((Position::MiddleRight, "win")));
        assert_eq!(heuristic_move(&both, Player::X), Some((Position::TopRight, "win")));
    }

    #[test]
    fn test_heuristic_blocks() {
        let b = board(&[(Position::TopLeft, Player::X), (Position::TopCenter, Player::X), (Position::Center, Player::O)]);
        assert_eq!(heuristic_move(&b, Player::O), Some((Position::TopRight, "block")));
    }

    #[test]
    fn test_last_cell() {
        use Player::{O, X};
        // X O X / X O O / O . X  leaves only the bottom edge, which completes O's column.
        let b = board(&[
            (Position::TopLeft, X),
            (Position::TopCenter, O),
            (Position::TopRight, X),
            (Position::MiddleLeft, X),
            (Position::Center, O),
            (Position::MiddleRight, O),
            (Position::BottomLeft, O),
            (Position::BottomRight, X),
        ]);
        assert_eq!(heuristic_move(&b, O), Some((Position::BottomCenter, "win")));
        assert_eq!(heuristic_move(&b, X), Some((Position::BottomCenter, "block")));
    }

    #[test]
    fn test_win_probability_terminal_and_immediate() {
        let won = board(&[
            (Position::TopLeft, Player::X),
            (Position::TopCenter, Player::X),
            (Position::TopRight, Player::X),
            (Position::Center, Player::O),
            (Position::BottomRight, Player::O),
        ]);
        assert_eq!(assess_win_probability(&won, Player::X).win, 1.0);
        assert_eq!(assess_win_probability(&won, Player::O).loss, 1.0);

        // X to move with an open top row.
        let threat = board(&[
            (Position::TopLeft, Player::X),
            (Position::TopCenter, Player::X),
            (Position::Center, Player::O),
            (Position::BottomRight, Player::O),
        ]);
        assert_eq!(assess_win_probability(&threat, Player::X).basis, "immediate win available");
        assert_eq!(assess_win_probability(&threat, Player::O).basis, "opponent has an immediate win");
    }

    #[test]
    fn test_evaluation_prefers_center() {
        let b = board(&[(Position::Center, Player::X)]);
        assert!(evaluate_position(&b, Player::X).score > 0);
        assert!(evaluate_position(&b, Player::O).score < 0);
    }
}
