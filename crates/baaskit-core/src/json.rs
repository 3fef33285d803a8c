//! JSON helpers shared by task classifiers
//!
//! Server payloads wrap the useful part in a `data` member:
//! `{"result": "ok", "data": {...}, "http_code": 200}`. Errors carry a `message`.

use crate::envelope::ParseError;
use serde_json::Value as JsonValue;

/// Decode a response body, mapping failures to a parse error
pub fn decode_json(body: &[u8]) -> Result<JsonValue, ParseError> {
    serde_json::from_slice(body).map_err(|e| ParseError::new(format!("invalid JSON body: {}", e)))
}

/// Decode a body and return its `data` member
pub fn decode_data(body: &[u8]) -> Result<JsonValue, ParseError> {
    let mut root = decode_json(body)?;
    match root.get_mut("data") {
        Some(data) => Ok(data.take()),
        None => Err(ParseError::new("response has no 'data' member")),
    }
}

/// String at a JSON pointer such as `/user/name`
pub fn string_at(value: &JsonValue, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(JsonValue::as_str).map(str::to_string)
}

/// Like [`string_at`], but a missing or empty value is a parse error
pub fn require_string(value: &JsonValue, pointer: &str) -> Result<String, ParseError> {
    match string_at(value, pointer) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ParseError::new(format!("missing field '{}'", pointer))),
    }
}

/// Human readable reason from an error body, if the server sent one
pub fn error_message(body: &[u8]) -> Option<String> {
    let root: JsonValue = serde_json::from_slice(body).ok()?;
    string_at(&root, "/message").filter(|m| !m.is_empty())
}
