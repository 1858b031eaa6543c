//! Game engine: validated moves, history and derived status.

use crate::error::MoveError;
use crate::rules::{check_winner, is_full};
use crate::{Board, GameStatus, Player, Position, Square};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// A recorded move. Immutable once appended to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
    /// Mark placed.
    pub player: Player,
    /// 1-based sequence number.
    pub move_number: usize,
}

impl Move {
    /// Board position of this move; `None` when row or column is off the board.
    pub fn position(&self) -> Option<Position> {
        Position::from_row_col(self.row, self.col)
    }
}

/// Tic-tac-toe game engine.
///
/// X always moves first. The side to move and the status are computed from
/// the board, so they cannot drift out of sync with the cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Game {
    board: Board,
    history: Vec<Move>,
}

impl Game {
    /// Creates a new game.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the move history, oldest first.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Number of moves made.
    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    /// Win, draw or in progress, derived from the cells.
    #[instrument(skip(self))]
    pub fn status(&self) -> GameStatus {
        if let Some(winner) = check_winner(&self.board) {
            GameStatus::Won(winner)
        } else if is_full(&self.board) {
            GameStatus::Draw
        } else {
            GameStatus::InProgress
        }
    }

    /// Side to move, or `None` once the game is over.
    pub fn current_player(&self) -> Option<Player> {
        if self.status().is_over() {
            return None;
        }
        Some(self.next_mark())
    }

    fn next_mark(&self) -> Player {
        if self.board.count(Player::X) == self.board.count(Player::O) {
            Player::X
        } else {
            Player::O
        }
    }

    /// Places `player`'s mark at `(row, col)`.
    ///
    /// # Errors
    ///
    /// Rejects, without touching the board, a move after the game ended,
    /// coordinates outside the grid, an occupied square, or a mark that is
    /// not the side to move.
    #[instrument(skip(self), fields(move_count = self.history.len()))]
    pub fn make_move(&mut self, row: usize, col: usize, player: Player) -> Result<Move, MoveError> {
        if self.status().is_over() {
            warn!("Move rejected: game over");
            return Err(MoveError::GameOver);
        }

        let pos = Position::from_row_col(row, col).ok_or_else(|| {
            warn!("Move rejected: out of bounds");
            MoveError::OutOfBounds { row, col }
        })?;

        if !self.board.is_empty(pos) {
            warn!("Move rejected: square occupied");
            return Err(MoveError::Occupied { row, col });
        }

        let expected = self.next_mark();
        if player != expected {
            warn!(%expected, "Move rejected: wrong turn");
            return Err(MoveError::WrongTurn {
                expected,
                attempted: player,
            });
        }

        self.board.set(pos, Square::Occupied(player));
        let mv = Move {
            row,
            col,
            player,
            move_number: self.history.len() + 1,
        };
        self.history.push(mv);
        debug!(status = %self.status(), "Move applied");
        Ok(mv)
    }

    /// Clears the board and history; X moves next.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.board = Board::new();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x_moves_first() {
        let mut game = Game::new();
        assert_eq!(game.current_player(), Some(Player::X));
        assert_eq!(
            game.make_move(0, 0, Player::O),
            Err(MoveError::WrongTurn {
                expected: Player::X,
                attempted: Player::O
            })
        );
        assert_eq!(game.move_count(), 0);
    }

    #[test]
    fn test_move_numbers_are_sequential() {
        let mut game = Game::new();
        game.make_move(1, 1, Player::X).unwrap();
        let second = game.make_move(0, 0, Player::O).unwrap();
        assert_eq!(second.move_number, 2);
        assert_eq!(second.position(), Some(Position::TopLeft));
        assert_eq!(game.current_player(), Some(Player::X));
    }

    #[test]
    fn test_deserialized_move_off_the_board_has_no_position() {
        let mv: Move =
            serde_json::from_str(r#"{"row": 3, "col": 0, "player": "X", "move_number": 1}"#).unwrap();
        assert_eq!(mv.position(), None);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut game = Game::new();
        assert_eq!(
            game.make_move(3, 1, Player::X),
            Err(MoveError::OutOfBounds { row: 3, col: 1 })
        );
    }

    #[test]
    fn test_no_moves_after_win() {
        let mut game = Game::new();
        for (row, col, player) in [
            (0, 0, Player::X),
            (1, 0, Player::O),
            (0, 1, Player::X),
            (1, 1, Player::O),
            (0, 2, Player::X),
        ] {
            game.make_move(row, col, player).unwrap();
        }
        assert_eq!(game.status(), GameStatus::Won(Player::X));
        assert_eq!(game.current_player(), None);
        assert_eq!(game.make_move(2, 2, Player::O), Err(MoveError::GameOver));
    }
}
