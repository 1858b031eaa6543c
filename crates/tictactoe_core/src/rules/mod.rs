//! Game rules for tic-tac-toe.
//!
//! Pure functions over a [`Board`](crate::Board). Status is always derived
//! from the cells, never stored alongside them.

pub mod draw;
pub mod threats;
pub mod win;

pub use draw::{is_draw, is_full};
pub use threats::winning_cells;
pub use win::{LINES, check_winner, has_line};
