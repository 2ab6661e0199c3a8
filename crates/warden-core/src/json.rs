//! Presence checks and lenient scalar coercion over `serde_json` values.
//!
//! Tool payloads come from an LLM controller and are only loosely typed.
//! Two rules hold throughout:
//!
//! - Presence of a key is decided by [`has_key`] alone. A lookup that
//!   yields some default or placeholder node never counts as presence.
//! - Scalar extraction never fails: [`as_int`] and [`as_bool`] fall back
//!   to `0` and `false` for wrong-typed nodes.

use serde_json::Value;

/// Whether `node` is an object that contains `key`.
///
/// Returns `false` for non-objects and for keys that were never written,
/// regardless of what an indexing lookup would produce for them.
pub fn has_key(node: &Value, key: &str) -> bool {
    node.as_object().is_some_and(|map| map.contains_key(key))
}

/// The value stored under `key`, only when the key is actually present.
pub fn get<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    if has_key(node, key) {
        node.as_object().and_then(|map| map.get(key))
    } else {
        None
    }
}

/// The value under `key` when it is present and carries a usable value:
/// not `null` and not an empty (or whitespace-only) string.
pub fn supplied<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    get(node, key).filter(|value| match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

/// Coerce a node to an integer.
///
/// Integers pass through, floats truncate toward zero (saturating at the
/// `i64` range), numeric strings are parsed. Anything else yields `0`.
pub fn as_int(node: &Value) -> i64 {
    match node {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(truncate_f64))
            .unwrap_or(0),
        Value::String(s) => parse_int(s).unwrap_or(0),
        _ => 0,
    }
}

/// Coerce a node to a boolean.
///
/// Booleans pass through and the strings `"true"` / `"false"` are parsed
/// case-insensitively. Anything else yields `false`.
pub fn as_bool(node: &Value) -> bool {
    match node {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// The node's string content, trimmed, when it is a non-empty string.
pub fn as_str(node: &Value) -> Option<&str> {
    node.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Collect the integers of an id list.
///
/// Accepts a JSON array of numbers or numeric strings, a string holding a
/// JSON array (`"[1, 2]"`, a common controller quirk), or a single
/// number. Elements that are not integers are skipped.
pub fn int_list(node: &Value) -> Vec<i64> {
    match node {
        Value::Array(items) => items.iter().filter_map(strict_int).collect(),
        Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(Value::Array(items)) => items.iter().filter_map(strict_int).collect(),
            _ => parse_int(s).into_iter().collect(),
        },
        Value::Number(_) => strict_int(node).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// An integer element of an id list, or `None` when the node is not one.
fn strict_int(node: &Value) -> Option<i64> {
    match node {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract().abs() < f64::EPSILON)
                .map(truncate_f64)
        }),
        Value::String(s) => parse_int(s),
        _ => None,
    }
}

/// Parse an integer, accepting float notation (`"12.0"`) by truncation.
fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().filter(|f| f.is_finite()).map(truncate_f64))
}

/// Truncate a float toward zero, saturating at the `i64` range.
#[allow(clippy::cast_possible_truncation)]
fn truncate_f64(value: f64) -> i64 {
    // `as` saturates for out-of-range floats and maps NaN to 0.
    value.trunc() as i64
}
