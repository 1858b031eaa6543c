//! Tool argument types. Their JSON Schemas are published as `inputSchema`.

use super::{Cell, ToolError};
use schemars::JsonSchema;
use serde::{Deserialize, de::DeserializeOwned};
use rmcp::model::JsonObject;
use serde_json::Value;
use std::sync::Arc;
use tictactoe_core::{Board, Player, Position, Square};

/// Arguments for tools that inspect a board.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct BoardArgs {
    /// Board as three rows of `"X"`, `"O"` or `null`/`""`. Defaults to the live game.
    #[serde(default)]
    pub board: Option<Vec<Vec<Option<String>>>>,
    /// Mark to analyse for (`"X"` or `"O"`). Defaults to the side to move.
    #[serde(default)]
    pub player: Option<String>,
}

/// A single cell, optionally on a supplied board.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MoveArgs {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
    /// Board to check against. Defaults to the live game.
    #[serde(default)]
    pub board: Option<Vec<Vec<Option<String>>>>,
}

/// Arguments for `execute_move`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ExecuteMoveArgs {
    /// Move the strategist recommended.
    #[serde(default)]
    pub recommended_move: Option<Cell>,
    /// Board to execute on. Defaults to the live game.
    #[serde(default)]
    pub board: Option<Vec<Vec<Option<String>>>>,
    /// Mark to place. Defaults to the side to move.
    #[serde(default)]
    pub player: Option<String>,
}

/// JSON Schema of `T`, shaped for a tool's `inputSchema`.
pub fn schema_of<T: JsonSchema>() -> Arc<JsonObject> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(map)) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

/// Serializes a tool result.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Failed { message: e.to_string() })
}

/// Deserializes tool arguments; `null` counts as `{}`.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments { message: e.to_string() })
}

/// Builds a board from wire rows.
///
/// # Errors
///
/// Fails unless there are three rows of three cells, each `X`, `O`, empty or null.
pub fn board_from_rows(rows: &[Vec<Option<String>>]) -> Result<Board, ToolError> {
    let invalid = |message: String| ToolError::InvalidArguments { message };
    if rows.len() != 3 || rows.iter().any(|r| r.len() != 3) {
        return Err(invalid("board must be 3 rows of 3 cells".to_string()));
    }
    let mut board = Board::new();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let Some(mark) = cell.as_deref().map(str::trim).filter(|m| !m.is_empty()) else {
                continue;
            };
            let player = Player::from_mark(mark)
                .ok_or_else(|| invalid(format!("cell ({r}, {c}) has invalid mark {mark:?}")))?;
            if let Some(pos) = Position::from_row_col(r, c) {
                board.set(pos, Square::Occupied(player));
            }
        }
    }
    Ok(board)
}

/// The board named by `rows`, or `current`.
pub(crate) fn resolve_board(rows: Option<&[Vec<Option<String>>]>, current: &Board) -> Result<Board, ToolError> {
    match rows {
        Some(rows) => board_from_rows(rows),
        None => Ok(current.clone()),
    }
}

/// The player named by `mark`, or the side to move on `board`.
pub(crate) fn resolve_player(mark: Option<&str>, board: &Board) -> Result<Player, ToolError> {
    match mark {
        Some(mark) => Player::from_mark(mark).ok_or_else(|| ToolError::InvalidArguments {
            message: format!("player must be \"X\" or \"O\", got {mark:?}"),
        }),
        None => Ok(super::side_to_move(board)),
    }
}
