//! Decides whether a message body already is a monitoring event.

use serde_json::{Map, Value};

/// Keys of the ingest event shape, used to score partially formed events.
pub const EVENT_KEYS: [&str; 7] = [
    "endTime",
    "entitySelector",
    "eventType",
    "properties",
    "startTime",
    "timeout",
    "title",
];

const MIN_EVENT_KEY_SCORE: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    PreFormed,
    Raw,
}

/// A message body after classification.
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    /// Body is a JSON object shaped like an event; enriched in place.
    PreFormed(Map<String, Value>),
    /// Anything else. `parsed` keeps the object when the body was JSON so
    /// the original-queue hint can still be read from it.
    Raw {
        body: String,
        parsed: Option<Map<String, Value>>,
    },
}

impl Document {
    pub fn kind(&self) -> Kind {
        match self {
            Document::PreFormed(_) => Kind::PreFormed,
            Document::Raw { .. } => Kind::Raw,
        }
    }

    pub fn parsed(&self) -> Option<&Map<String, Value>> {
        match self {
            Document::PreFormed(map) => Some(map),
            Document::Raw { parsed, .. } => parsed.as_ref(),
        }
    }
}

pub fn classify(body: &str) -> Document {
    match serde_json::from_str::<Map<String, Value>>(body) {
        Ok(map) if looks_like_event(&map) => Document::PreFormed(map),
        Ok(map) => Document::Raw {
            body: body.to_string(),
            parsed: Some(map),
        },
        Err(_) => Document::Raw {
            body: body.to_string(),
            parsed: None,
        },
    }
}

/// `eventType` plus `title` is always an event; otherwise at least three of
/// [`EVENT_KEYS`] must be present.
pub fn looks_like_event(map: &Map<String, Value>) -> bool {
    if map.contains_key("eventType") && map.contains_key("title") {
        return true;
    }
    let score = EVENT_KEYS.iter().filter(|k| map.contains_key(**k)).count();
    score >= MIN_EVENT_KEY_SCORE
}
