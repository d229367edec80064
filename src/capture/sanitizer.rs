//! Sensitive-field redaction for captured bodies.
//!
//! Only top-level keys of a JSON object are inspected. Anything that is not a
//! JSON object passes through untouched, including malformed text.

use serde_json::{Map, Value};

/// Replacement written over sensitive values.
pub const MASK: &str = "***MASKED***";

/// Top-level keys whose values never leave the process. Case-sensitive.
pub const SENSITIVE_FIELDS: &[&str] = &["password", "token", "accessToken", "refreshToken", "secret"];

/// Redact a captured body.
///
/// Returns `None` for absent or blank input without attempting to parse.
pub fn sanitize(body: Option<&str>) -> Option<String> {
    let body = body.filter(|b| !b.trim().is_empty())?;

    let Some(mut object) = parse_object(body) else {
        return Some(body.to_string());
    };

    for field in SENSITIVE_FIELDS {
        if let Some(value) = object.get_mut(*field) {
            *value = Value::String(MASK.to_string());
        }
    }

    Some(serde_json::to_string(&object).unwrap_or_else(|_| body.to_string()))
}

/// Parse `text` as a JSON object, or `None` if it is anything else.
fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
