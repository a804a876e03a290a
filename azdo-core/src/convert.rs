//! Nil-safe readers for untyped wire payloads
//!
//! Trigger, phase and property payloads arrive as loosely typed JSON maps. The
//! service is not consistent about representation (numbers as floats, booleans
//! as strings), so every read goes through one of these helpers with an
//! explicit default.

use serde_json::Value;

/// Read a string, falling back to `default` when absent or not a string
pub fn string_or(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

/// Read a boolean; accepts JSON booleans and `"true"`/`"false"` strings
pub fn bool_or(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => parse_bool(s).unwrap_or(default),
        _ => default,
    }
}

/// Read an integer; accepts integers, floats with no fraction and numeric strings
pub fn int_or(value: Option<&Value>, default: i64) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// [`int_or`] narrowed to `i32`; values out of range read as `default`
pub fn int32_or(value: Option<&Value>, default: i32) -> i32 {
    i32::try_from(int_or(value, i64::from(default))).unwrap_or(default)
}

/// Read a list of strings, skipping non-string and empty entries
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `None` for an empty string, `Some` otherwise
pub fn opt_string(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Case-insensitive boolean parse accepting the forms the service emits
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
