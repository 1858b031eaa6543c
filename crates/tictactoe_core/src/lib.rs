//! Pure tic-tac-toe game logic.
//!
//! A 3x3 board, validated moves with an append-only history, and brute-force
//! rules over the eight winning lines. No I/O, no async.
//!
//! ```
//! use tictactoe_core::{Game, GameStatus, Player, winning_cells, Position};
//!
//! let mut game = Game::new();
//! game.make_move(0, 0, Player::X).unwrap();
//! game.make_move(1, 1, Player::O).unwrap();
//! game.make_move(0, 1, Player::X).unwrap();
//!
//! assert_eq!(game.status(), GameStatus::InProgress);
//! assert_eq!(winning_cells(game.board(), Player::X), vec![Position::TopRight]);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod game;
mod position;
pub mod rules;
mod types;

pub use error::MoveError;
pub use game::{Game, Move};
pub use position::Position;
pub use rules::{LINES, check_winner, has_line, is_draw, is_full, winning_cells};
pub use types::{Board, GameStatus, Player, Square};
