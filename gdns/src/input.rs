use crate::errors::GlobalDnsError;
use crate::types::PROJECT_IDS_FIELD;
use serde_json::Value;

/// Parses an action request body. An empty body is treated as an empty
/// input mapping rather than an error.
pub fn parse_action_body(bytes: &[u8]) -> Result<Value, GlobalDnsError> {
    if bytes.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| GlobalDnsError::RequestBody(e.to_string()))
}

/// Extracts the project id list from a decoded action body.
///
/// A missing field yields an empty list. A bare string counts as a
/// one-element list. Inside a list, non-string scalars are coerced to
/// their display form and anything else is dropped silently; existing
/// clients rely on this leniency, so it must not be tightened.
pub fn project_ids(input: &Value) -> Vec<String> {
    match input.get(PROJECT_IDS_FIELD) {
        None => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().filter_map(coerce_to_string).collect(),
        Some(_) => Vec::new(),
    }
}

fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
