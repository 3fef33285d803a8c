//! Masking of credentials in logs and printed output

use serde_json::{Map, Value as JsonValue};

/// Field names whose values are always masked
const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "x-bb-session",
    "oauth_token",
    "oauth_secret",
    "authorization",
    // password change body
    "old",
    "new",
];

/// Substrings that mark a field as sensitive (case-insensitive)
const SENSITIVE_PATTERNS: &[&str] = &["_token", "_secret", "_password", "-session"];

const SANITIZED_PLACEHOLDER: &str = "***REDACTED***";

/// Check if a field name indicates sensitive data
pub fn is_sensitive_field(field_name: &str) -> bool {
    let field_lower = field_name.to_lowercase();

    if SENSITIVE_FIELDS.iter().any(|&sensitive| field_lower == sensitive) {
        return true;
    }

    SENSITIVE_PATTERNS.iter().any(|&pattern| field_lower.contains(pattern))
}

/// Replace the values of sensitive fields with a placeholder, recursively
pub fn sanitize_json_value(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let sanitized: Map<String, JsonValue> = map
                .iter()
                .map(|(key, val)| {
                    let sanitized_val = if is_sensitive_field(key) {
                        match val {
                            JsonValue::String(_) | JsonValue::Number(_) | JsonValue::Bool(_) => {
                                JsonValue::String(SANITIZED_PLACEHOLDER.to_string())
                            }
                            other => sanitize_json_value(other),
                        }
                    } else {
                        sanitize_json_value(val)
                    };
                    (key.clone(), sanitized_val)
                })
                .collect();
            JsonValue::Object(sanitized)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(sanitize_json_value).collect()),
        other => other.clone(),
    }
}

/// Loggable form of a raw body: sanitized JSON, or a size note for anything else
pub fn sanitize_body(body: &[u8]) -> String {
    match serde_json::from_slice::<JsonValue>(body) {
        Ok(json) => sanitize_json_value(&json).to_string(),
        Err(_) => format!("<{} bytes>", body.len()),
    }
}
