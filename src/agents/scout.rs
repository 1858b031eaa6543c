//! Scout: reads the board and reports threats and opportunities.

use super::args::{BoardArgs, parse_args, resolve_board, resolve_player, to_json};
use super::{
    Agent, AgentCore, Cell, Placeholder, PromptSpec, ToolError, describe_board,
    format_cells, schema_of,
};
use async_trait::async_trait;
use rmcp::model::Tool;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tictactoe_core::{Board, LINES, Player, Position, Square, winning_cells};
use tracing::{info, instrument, warn};

const SYSTEM_PROMPT: &str = "You are the Scout in a tic-tac-toe team. You read boards precisely and \
report immediate threats and opportunities. Coordinates are zero-based (row, col). Be brief.";

const BOARD_ANALYSIS: &str = "Analyze this tic-tac-toe position for player {player}.

{board}
Available moves: {available_moves}
Cells where {player} wins immediately: {opportunities}
Cells the opponent wins on next turn (must block): {threats}

In two or three sentences, summarize the position: immediate threats, opportunities and which \
squares matter most.";

const THREAT_DETECTION: &str = "On this board, list every empty cell where {player} could complete \
three in a row on their next move. Answer with a JSON array of [row, col] pairs.

{board}";

/// What the Scout saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Mark the analysis is for.
    pub player: Player,
    /// Moves made so far.
    pub move_count: usize,
    /// Empty cells.
    pub available_moves: Vec<Cell>,
    /// Cells the opponent would win on next turn.
    pub threats: Vec<Cell>,
    /// Cells where `player` wins now.
    pub opportunities: Vec<Cell>,
    /// Model narrative, or a generated summary on fallback.
    pub analysis: String,
    /// Whether the narrative came from the fallback.
    pub fallback_used: bool,
}

impl Observation {
    /// The deterministic part of an observation; `analysis` is left empty.
    pub fn scan(board: &Board, player: Player) -> Self {
        let cells = |positions: Vec<Position>| positions.into_iter().map(Cell::from).collect::<Vec<_>>();
        Self {
            player,
            move_count: board.occupied(),
            available_moves: cells(board.empty_positions()),
            threats: cells(winning_cells(board, player.opponent())),
            opportunities: cells(winning_cells(board, player)),
            analysis: String::new(),
            fallback_used: false,
        }
    }

    fn summary(&self) -> String {
        format!(
            "Basic analysis: {} moves available, {} threat(s) to block, {} winning move(s).",
            self.available_moves.len(),
            self.threats.len(),
            self.opportunities.len()
        )
    }
}

/// Stage of the game by move count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    /// Up to two moves made.
    Opening,
    /// Three to five moves.
    Midgame,
    /// Six or more.
    Endgame,
}

impl GamePhase {
    fn from_moves(moves: usize) -> Self {
        match moves {
            0..=2 => GamePhase::Opening,
            3..=5 => GamePhase::Midgame,
            _ => GamePhase::Endgame,
        }
    }
}

/// Structural read of a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    /// Stage of the game.
    pub phase: GamePhase,
    /// Who holds the center.
    pub center: Option<Player>,
    /// Corners held by X.
    pub corners_x: usize,
    /// Corners held by O.
    pub corners_o: usize,
    /// Lines X could still complete.
    pub open_lines_x: usize,
    /// Lines O could still complete.
    pub open_lines_o: usize,
    /// Cells where X would win next move.
    pub winning_cells_x: Vec<Cell>,
    /// Cells where O would win next move.
    pub winning_cells_o: Vec<Cell>,
    /// A player with two or more immediate wins has a fork.
    pub fork: Option<Player>,
}

/// Lines containing no mark of `player`'s opponent.
pub(crate) fn open_lines(board: &Board, player: Player) -> usize {
    let blocker = Square::Occupied(player.opponent());
    LINES
        .iter()
        .filter(|line| line.iter().all(|pos| board.get(*pos) != blocker))
        .count()
}

/// Phase, center, corners, open lines and forks.
#[instrument(skip(board))]
pub fn pattern_analysis(board: &Board) -> PatternAnalysis {
    let corners = |player| {
        Position::CORNERS
            .iter()
            .filter(|pos| board.get(**pos) == Square::Occupied(player))
            .count()
    };
    let wins = |player| winning_cells(board, player).into_iter().map(Cell::from).collect::<Vec<_>>();
    let winning_cells_x = wins(Player::X);
    let winning_cells_o = wins(Player::O);
    let fork = match (winning_cells_x.len() >= 2, winning_cells_o.len() >= 2) {
        (true, false) => Some(Player::X),
        (false, true) => Some(Player::O),
        _ => None,
    };
    PatternAnalysis {
        phase: GamePhase::from_moves(board.occupied()),
        center: board.get(Position::Center).player(),
        corners_x: corners(Player::X),
        corners_o: corners(Player::O),
        open_lines_x: open_lines(board, Player::X),
        open_lines_o: open_lines(board, Player::O),
        winning_cells_x,
        winning_cells_o,
        fork,
    }
}

/// Board analysis agent.
#[derive(Debug)]
pub struct Scout {
    core: AgentCore,
}

impl Scout {
    /// Wraps `core`.
    pub fn new(core: AgentCore) -> Self {
        Self { core }
    }

    fn prompt_args(observation: &Observation, board: &Board) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("board".to_string(), describe_board(board)),
            ("player".to_string(), observation.player.to_string()),
            ("available_moves".to_string(), format_cells(&observation.available_moves)),
            ("threats".to_string(), format_cells(&observation.threats)),
            ("opportunities".to_string(), format_cells(&observation.opportunities)),
        ])
    }

    /// Scans the board for `player` and asks the model for a narrative.
    ///
    /// Threat and opportunity lists always come from the deterministic scan;
    /// a failed model call only replaces the narrative.
    #[instrument(skip(self, board), fields(player = %player))]
    pub async fn analyze_board(&self, board: &Board, player: Player) -> Observation {
        let mut observation = Observation::scan(board, player);
        let prompt = Self::prompt_args(&observation, board);

        let rendered = board_analysis_prompt().render(&prompt);
        let reply = match rendered {
            Ok(user) => self.core.complete(SYSTEM_PROMPT, &user).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match reply {
            Ok(completion) if !completion.content.trim().is_empty() => {
                observation.analysis = completion.content.trim().to_string();
            }
            Ok(_) => {
                warn!("Empty analysis from model, using summary");
                observation.analysis = observation.summary();
                observation.fallback_used = true;
                self.core.record_fallback().await;
            }
            Err(error) => {
                warn!(%error, "Scout analysis fell back to summary");
                observation.analysis = observation.summary();
                observation.fallback_used = true;
                self.core.record_fallback().await;
            }
        }

        info!(
            threats = observation.threats.len(),
            opportunities = observation.opportunities.len(),
            fallback = observation.fallback_used,
            "Board analyzed"
        );
        observation
    }
}

fn board_analysis_prompt() -> PromptSpec {
    PromptSpec {
        name: "board_analysis",
        description: "Narrative analysis of a position for one player",
        arguments: vec![
            Placeholder::required("board", "Board grid with coordinates"),
            Placeholder::required("player", "Mark to analyse for"),
            Placeholder::optional("available_moves", "Empty cells"),
            Placeholder::optional("threats", "Opponent's immediate wins"),
            Placeholder::optional("opportunities", "Player's immediate wins"),
        ],
        template: BOARD_ANALYSIS,
    }
}

fn threat_detection_prompt() -> PromptSpec {
    PromptSpec {
        name: "threat_detection",
        description: "Ask for every cell that completes a line for a player",
        arguments: vec![
            Placeholder::required("board", "Board grid with coordinates"),
            Placeholder::required("player", "Mark to check"),
        ],
        template: THREAT_DETECTION,
    }
}

#[async_trait]
impl Agent for Scout {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn tools(&self) -> Vec<Tool> {
        let schema = schema_of::<BoardArgs>();
        vec![
            Tool::new(
                "analyze_board",
                "Full observation: available moves, threats, opportunities and a narrative",
                schema.clone(),
            ),
            Tool::new(
                "detect_threats",
                "Cells the opponent would win on next turn",
                schema.clone(),
            ),
            Tool::new(
                "identify_opportunities",
                "Cells where the player wins immediately",
                schema.clone(),
            ),
            Tool::new(
                "get_pattern_analysis",
                "Game phase, center and corner control, open lines and forks",
                schema,
            ),
        ]
    }

    fn prompts(&self) -> Vec<PromptSpec> {
        vec![board_analysis_prompt(), threat_detection_prompt()]
    }

    #[instrument(skip(self, arguments, current))]
    async fn call_tool(&self, name: &str, arguments: Value, current: &Board) -> Result<Value, ToolError> {
        let args: BoardArgs = parse_args(arguments)?;
        let board = resolve_board(args.board.as_deref(), current)?;
        let player = resolve_player(args.player.as_deref(), &board)?;

        let value = match name {
            "analyze_board" => to_json(&self.analyze_board(&board, player).await)?,
            "detect_threats" => {
                let observation = Observation::scan(&board, player);
                json!({ "player": player, "threats": observation.threats, "must_block": !observation.threats.is_empty() })
            }
            "identify_opportunities" => {
                let observation = Observation::scan(&board, player);
                json!({ "player": player, "opportunities": observation.opportunities, "can_win": !observation.opportunities.is_empty() })
            }
            "get_pattern_analysis" => to_json(&pattern_analysis(&board))?,
            other => return Err(ToolError::unknown_tool(other)),
        };
        Ok(value)
    }
}
