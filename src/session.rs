//! The single shared game: human plays X, the agents play O.

use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use tictactoe_core::{Board, Game, Move, MoveError, Player};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Mark played by the human.
pub const HUMAN: Player = Player::X;
/// Mark played by the agents.
pub const AI: Player = Player::O;

/// Why a session move was refused.
#[derive(Debug, Display, Error, From, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The game rules rejected the move.
    #[display("{_0}")]
    #[from]
    Move(MoveError),
    /// The board changed while the agents were deciding.
    #[display("Board changed while the AI was thinking; request a new AI move")]
    StaleDecision,
}

impl SessionError {
    /// Whether the error is about whose turn it is rather than the move itself.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SessionError::Move(MoveError::WrongTurn { .. }) | SessionError::StaleDecision)
    }
}

/// Wire view of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Three rows of `"X"`, `"O"` or `null`.
    pub board: [[Option<Player>; 3]; 3],
    /// Side to move; `None` once the game is over.
    pub current_player: Option<Player>,
    /// `in_progress`, `won` or `draw`.
    pub status: String,
    /// Winning mark, if any.
    pub winner: Option<Player>,
    /// Whether the game is finished.
    pub game_over: bool,
    /// Moves made.
    pub move_count: usize,
    /// Every move in order.
    pub history: Vec<Move>,
}

impl From<&Game> for GameSnapshot {
    fn from(game: &Game) -> Self {
        let status = game.status();
        Self {
            board: game.board().rows(),
            current_player: game.current_player(),
            status: status.to_string(),
            winner: status.winner(),
            game_over: status.is_over(),
            move_count: game.move_count(),
            history: game.history().to_vec(),
        }
    }
}

/// The live game behind an async mutex.
#[derive(Debug, Default)]
pub struct GameSession {
    game: Mutex<Game>,
}

impl GameSession {
    /// A fresh game.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub async fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::from(&*self.game.lock().await)
    }

    /// A copy of the board for agents to work on without holding the lock.
    pub async fn board(&self) -> Board {
        self.game.lock().await.board().clone()
    }

    /// Side to move, `None` when the game is over.
    pub async fn current_player(&self) -> Option<Player> {
        self.game.lock().await.current_player()
    }

    /// Plays `row, col` for `player`.
    #[instrument(skip(self))]
    pub async fn play(&self, row: usize, col: usize, player: Player) -> Result<(Move, GameSnapshot), SessionError> {
        let mut game = self.game.lock().await;
        let mv = game.make_move(row, col, player).inspect_err(|e| warn!(error = %e, "Move rejected"))?;
        info!(move_number = mv.move_number, status = %game.status(), "Move applied");
        Ok((mv, GameSnapshot::from(&*game)))
    }

    /// Plays an AI move decided on `decided_on`.
    ///
    /// # Errors
    ///
    /// [`SessionError::StaleDecision`] when the board is no longer `decided_on`.
    #[instrument(skip(self, decided_on))]
    pub async fn play_decided(
        &self,
        row: usize,
        col: usize,
        player: Player,
        decided_on: &Board,
    ) -> Result<(Move, GameSnapshot), SessionError> {
        let mut game = self.game.lock().await;
        if game.board() != decided_on {
            warn!("Board changed during AI decision");
            return Err(SessionError::StaleDecision);
        }
        let mv = game.make_move(row, col, player)?;
        info!(move_number = mv.move_number, status = %game.status(), "AI move applied");
        Ok((mv, GameSnapshot::from(&*game)))
    }

    /// Clears board and history.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> GameSnapshot {
        let mut game = self.game.lock().await;
        game.reset();
        info!("Game reset");
        GameSnapshot::from(&*game)
    }
}
