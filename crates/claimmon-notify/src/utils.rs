//! Helpers shared by the channels.

use claimmon_common::types::Alert;
use serde_json::Value;

/// Longest response body kept in an error message.
pub const MAX_BODY_LENGTH: usize = 2000;

/// Truncate to at most `max_len` bytes on a char boundary.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

/// Replace values of keys that look like secrets with `"***"`, recursively.
pub fn redact_sensitive_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let redacted = map
                .iter()
                .map(|(key, val)| {
                    let key_lower = key.to_lowercase();
                    let sensitive = ["password", "token", "secret", "api_key", "apikey"]
                        .iter()
                        .any(|needle| key_lower.contains(needle));
                    let val = if sensitive {
                        Value::String("***".to_string())
                    } else {
                        redact_sensitive_json(val)
                    };
                    (key.clone(), val)
                })
                .collect();
            Value::Object(redacted)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(redact_sensitive_json).collect()),
        _ => value.clone(),
    }
}

/// One-line summary used by the text channels.
pub fn short_text(alert: &Alert) -> String {
    format!(
        "[claimmon][{level}][{category}] {title}: {message}",
        level = alert.level,
        category = alert.category,
        title = alert.title,
        message = alert.message,
    )
}
