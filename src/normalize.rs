//! Normalization of raw leaderboard JSON into canonical score rows.
//!
//! Day files have accumulated several shapes over the game's lifetime:
//! a bare array, or an object wrapping the array under one of a few known
//! keys, with per-row field names that vary by export vintage. Each field
//! is resolved through an ordered list of accessors, first non-null wins.

use serde::Serialize;
use serde_json::Value;

/// Wrapper keys tried, in order, when a day payload is an object.
const WRAPPER_KEYS: [&str; 4] = ["friendData", "friends", "entries", "scores"];

/// Score field aliases, in priority order.
const SCORE_KEYS: [&str; 3] = ["score", "points", "total"];

/// A single normalized leaderboard entry.
///
/// `rank` is 1-based and shared between equal scores; the next distinct
/// score takes its 1-based position (so two users tied at rank 1 are
/// followed by rank 3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRow {
    pub username: String,
    pub user_id: Option<String>,
    pub score: i64,
    pub rank: usize,
}

/// Normalizes a raw day payload into ranked rows.
///
/// Rows without a username are dropped. Output is sorted descending by
/// score; the sort is stable, so equal scores keep payload order.
pub fn normalize(payload: &Value) -> Vec<ScoreRow> {
    let empty: &[Value] = &[];
    let arr: &[Value] = match payload {
        Value::Array(a) => a.as_slice(),
        Value::Object(map) => WRAPPER_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
            .map(|rows| rows.as_slice())
            .unwrap_or(empty),
        _ => empty,
    };

    let mut rows: Vec<ScoreRow> = arr
        .iter()
        .filter_map(|raw| {
            let username = extract_username(raw)?;
            Some(ScoreRow {
                username,
                user_id: extract_user_id(raw),
                score: extract_score(raw),
                rank: 0,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.score.cmp(&a.score));

    let mut rank = 0;
    let mut prev = None;
    for i in 0..rows.len() {
        if prev != Some(rows[i].score) {
            rank = i + 1;
            prev = Some(rows[i].score);
        }
        rows[i].rank = rank;
    }

    rows
}

/// Normalizes a day-index payload (bare array or `{dates: [...]}`) into
/// trimmed, non-empty date strings. Ordering is left to the caller.
pub fn normalize_index(payload: &Value) -> Vec<String> {
    let arr = match payload {
        Value::Array(a) => Some(a),
        Value::Object(map) => map.get("dates").and_then(Value::as_array),
        _ => None,
    };

    arr.into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Username accessors: `username`, `name`, `user.name`, `playerName`.
fn extract_username(raw: &Value) -> Option<String> {
    let name = raw
        .get("username")
        .and_then(Value::as_str)
        .or_else(|| raw.get("name").and_then(Value::as_str))
        .or_else(|| raw.get("user").and_then(|u| u.get("name")).and_then(Value::as_str))
        .or_else(|| raw.get("playerName").and_then(Value::as_str))?;

    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Id accessors: `userId`, `id`, `user.id`. Numeric ids are stringified.
fn extract_user_id(raw: &Value) -> Option<String> {
    raw.get("userId")
        .filter(|v| !v.is_null())
        .or_else(|| raw.get("id").filter(|v| !v.is_null()))
        .or_else(|| raw.get("user").and_then(|u| u.get("id")).filter(|v| !v.is_null()))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

/// Score accessors: `score`, `points`, `total`; null falls through to the
/// next alias. Unparseable values coerce to 0.
fn extract_score(raw: &Value) -> i64 {
    SCORE_KEYS
        .iter()
        .find_map(|k| raw.get(*k).filter(|v| !v.is_null()))
        .map(coerce_score)
        .unwrap_or(0)
}

fn coerce_score(value: &Value) -> i64 {
    if let Some(i) = value.as_i64() {
        i
    } else if let Some(f) = value.as_f64() {
        f as i64
    } else if let Some(s) = value.as_str() {
        let s = s.trim();
        s.parse::<i64>()
            .or_else(|_| s.parse::<f64>().map(|f| f as i64))
            .unwrap_or(0)
    } else {
        0
    }
}
