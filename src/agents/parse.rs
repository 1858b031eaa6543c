//! Pulling a move out of free-form model replies.

use super::Cell;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static TUPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*(\d+)\s*,\s*(\d+)\s*\)").expect("tuple pattern is valid"));
static BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*(\d+)\s*,\s*(\d+)\s*\]").expect("bracket pattern is valid"));
static ROW_COL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\brow\b\W{0,3}(\d+).{0,40}?\bcol(?:umn)?\b\W{0,3}(\d+)").expect("row/col pattern is valid")
});

/// First JSON object embedded in `text`, if any.
///
/// Models often wrap JSON in prose or code fences; this takes the span from
/// the first `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}

fn cell_from_value(value: &Value) -> Option<Cell> {
    let index = |v: &Value| v.as_u64().and_then(|n| usize::try_from(n).ok());
    match value {
        Value::Array(pair) if pair.len() == 2 => Some(Cell::new(index(&pair[0])?, index(&pair[1])?)),
        Value::Object(map) => Some(Cell::new(index(map.get("row")?)?, index(map.get("col")?)?)),
        _ => None,
    }
}

fn capture_cell(re: &Regex, text: &str) -> Option<Cell> {
    let caps = re.captures(text)?;
    Some(Cell::new(caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Extracts a `(row, col)` move from a model reply.
///
/// Tries, in order: a JSON object with `move`/`recommended_move` as `[r, c]`
/// or `{row, col}` (or top-level `row`/`col`); then `(r, c)`; then `[r, c]`;
/// then `row: r ... col: c`. Range is not checked here.
pub fn extract_move(text: &str) -> Option<Cell> {
    if let Some(json) = extract_json(text) {
        let from_json = ["move", "recommended_move", "cell"]
            .iter()
            .find_map(|key| json.get(*key).and_then(cell_from_value))
            .or_else(|| cell_from_value(&json));
        if from_json.is_some() {
            return from_json;
        }
    }
    capture_cell(&TUPLE, text)
        .or_else(|| capture_cell(&BRACKET, text))
        .or_else(|| capture_cell(&ROW_COL, text))
}
