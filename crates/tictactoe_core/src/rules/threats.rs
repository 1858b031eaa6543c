//! Single-ply lookahead: cells that would complete a line.

use super::win::LINES;
use crate::{Board, Player, Position, Square};
use tracing::instrument;

/// Every empty cell that would give `player` three in a row if taken now.
///
/// Called with the opponent this yields the cells that must be blocked;
/// called with the mover it yields immediate wins. Results are unique and
/// in row-major order.
#[instrument(skip(board))]
pub fn winning_cells(board: &Board, player: Player) -> Vec<Position> {
    let mark = Square::Occupied(player);
    let mut cells: Vec<Position> = LINES
        .iter()
        .filter_map(|line| {
            let owned = line.iter().filter(|pos| board.get(**pos) == mark).count();
            let empty: Vec<Position> = line.iter().copied().filter(|pos| board.is_empty(*pos)).collect();
            (owned == 2 && empty.len() == 1).then(|| empty[0])
        })
        .collect();
    cells.sort();
    cells.dedup();
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_board_has_no_threats() {
        assert!(winning_cells(&Board::new(), Player::X).is_empty());
    }

    #[test]
    fn test_open_row_end() {
        let mut board = Board::new();
        board.set(Position::TopLeft, Square::Occupied(Player::X));
        board.set(Position::TopCenter, Square::Occupied(Player::X));
        assert_eq!(winning_cells(&board, Player::X), vec![Position::TopRight]);
        assert!(winning_cells(&board, Player::O).is_empty());
    }

    #[test]
    fn test_blocked_line_is_not_a_threat() {
        let mut board = Board::new();
        board.set(Position::TopLeft, Square::Occupied(Player::X));
        board.set(Position::TopCenter, Square::Occupied(Player::X));
        board.set(Position::TopRight, Square::Occupied(Player::O));
        assert!(winning_cells(&board, Player::X).is_empty());
    }

    #[test]
    fn test_fork_reports_each_cell_once() {
        // X . X
        // . . .
        // X . .
        let mut board = Board::new();
        board.set(Position::TopLeft, Square::Occupied(Player::X));
        board.set(Position::TopRight, Square::Occupied(Player::X));
        board.set(Position::BottomLeft, Square::Occupied(Player::X));
        assert_eq!(
            winning_cells(&board, Player::X),
            vec![Position::TopCenter, Position::MiddleLeft, Position::Center]
        );
    }
}
