//! Whole-game properties over every reachable board.

use std::collections::HashSet;
use tictactoe_core::{Board, Game, GameStatus, MoveError, Player, Position, has_line};

/// Depth-first walk of every legal game, collecting each distinct position.
fn reachable(game: &Game, seen: &mut HashSet<Board>, out: &mut Vec<Game>) {
    if !seen.insert(game.board().clone()) {
        return;
    }
    out.push(game.clone());
    let Some(player) = game.current_player() else {
        return;
    };
    for pos in game.board().empty_positions() {
        let mut next = game.clone();
        next.make_move(pos.row(), pos.col(), player)
            .expect("empty square on an open game must accept the side to move");
        reachable(&next, seen, out);
    }
}

fn all_reachable() -> Vec<Game> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    reachable(&Game::new(), &mut seen, &mut out);
    out
}

#[test]
fn test_reachable_position_count() {
    // Well-known count of legal tic-tac-toe positions, empty board included.
    assert_eq!(all_reachable().len(), 5478);
}

#[test]
fn test_never_two_winners() {
    for game in all_reachable() {
        let board = game.board();
        assert!(
            !(has_line(board, Player::X) && has_line(board, Player::O)),
            "both players hold a line:\n{}",
            board.display()
        );
    }
}

#[test]
fn test_mark_counts_alternate() {
    for game in all_reachable() {
        let x = game.board().count(Player::X);
        let o = game.board().count(Player::O);
        assert!(x == o || x == o + 1, "x={x} o={o}");
    }
}

#[test]
fn test_nine_moves_without_winner_is_draw() {
    // X O X / X O O / O X X
    let moves = [
        (0, 0, Player::X),
        (0, 1, Player::O),
        (0, 2, Player::X),
        (1, 1, Player::O),
        (1, 0, Player::X),
        (1, 2, Player::O),
        (2, 1, Player::X),
        (2, 0, Player::O),
        (2, 2, Player::X),
    ];
    let mut game = Game::new();
    for (row, col, player) in moves {
        assert_eq!(game.status(), GameStatus::InProgress);
        game.make_move(row, col, player).expect("legal move");
    }
    assert_eq!(game.move_count(), 9);
    assert_eq!(game.status(), GameStatus::Draw);
    assert_eq!(game.current_player(), None);
}

#[test]
fn test_occupied_square_rejected_and_board_unchanged() {
    let mut game = Game::new();
    game.make_move(1, 1, Player::X).expect("legal move");
    let before = game.clone();

    let err = game.make_move(1, 1, Player::O).unwrap_err();

    assert_eq!(err, MoveError::Occupied { row: 1, col: 1 });
    assert_eq!(game, before);
    assert_eq!(err.to_string(), "Square (1, 1) is already occupied");
}

#[test]
fn test_reset_clears_everything() {
    let mut game = Game::new();
    game.make_move(0, 0, Player::X).expect("legal move");
    game.make_move(2, 2, Player::O).expect("legal move");

    game.reset();

    assert!(Position::ALL.iter().all(|p| game.board().is_empty(*p)));
    assert_eq!(game.move_count(), 0);
    assert!(game.history().is_empty());
    assert_eq!(game.current_player(), Some(Player::X));
}
