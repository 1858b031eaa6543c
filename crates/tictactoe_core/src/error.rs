//! Move rejection reasons.

use crate::Player;
use derive_more::{Display, Error};

/// Why a move was rejected. The board is unchanged whenever one is returned.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// The game already has a winner or is drawn.
    #[display("Game is already over")]
    GameOver,
    /// Row or column outside 0..3.
    #[display("Position ({row}, {col}) is out of bounds (row and col must be 0-2)")]
    OutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
    },
    /// The square already holds a mark.
    #[display("Square ({row}, {col}) is already occupied")]
    Occupied {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
    },
    /// The mark submitted is not the side to move.
    #[display("Not {attempted}'s turn ({expected} to move)")]
    WrongTurn {
        /// Side whose turn it is.
        expected: Player,
        /// Side that tried to move.
        attempted: Player,
    },
}
