use serde_json::{Map, Value};

use crate::message::InboundMessage;

/// Finds the queue a redelivered message originally came from.
///
/// A non-empty string under `property` in the parsed body takes priority over
/// a message attribute of the same name.
pub fn resolve_original_queue(
    message: &InboundMessage,
    parsed: Option<&Map<String, Value>>,
    property: &str,
) -> Option<String> {
    let from_body = parsed
        .and_then(|map| map.get(property))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());

    if let Some(hint) = from_body {
        return Some(hint.to_string());
    }

    message
        .message_attribute(property)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
