// src/grading/normalize.rs

use serde_json::Value;

/// String form of a raw JSON answer.
///
/// Strings are taken verbatim, numbers and booleans use their JSON text and
/// `null` becomes the empty string. Arrays and objects fall back to compact JSON.
pub fn answer_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Trims and lowercases an answer so comparisons ignore case and surrounding whitespace.
pub fn normalize(answer: &str) -> String {
    answer.trim().to_lowercase()
}
