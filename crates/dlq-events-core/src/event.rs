//! Monitoring events and the rules that build them from queue messages.

use serde_json::{Map, Value};

use crate::classify::Document;
use crate::config::Config;
use crate::message::{
    InboundMessage, APPROXIMATE_RECEIVE_COUNT, FIRST_RECEIVE_TIMESTAMP, SENT_TIMESTAMP,
};

/// Property carrying the original (pre dead letter) queue of a message.
pub const ORIGINAL_QUEUE_KEY: &str = "originalQueue";

const TRUNCATION_MARKER: char = '…';

/// Event shape accepted by the ingest endpoint.
///
/// When read from a producer's body, absent or `null` scalar fields decode as
/// their zero value (`""` or `0`).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_selector: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub event_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timeout: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    let value: Option<T> = serde::Deserialize::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Cuts `s` to at most `max` characters, appending a single `…` when cut.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((end, _)) => {
            let mut cut = String::with_capacity(end + TRUNCATION_MARKER.len_utf8());
            cut.push_str(&s[..end]);
            cut.push(TRUNCATION_MARKER);
            cut
        }
    }
}

/// Renders a message body as a single-line title candidate.
///
/// A JSON string yields its contents, any other JSON is re-serialized without
/// whitespace and everything else is returned verbatim.
pub fn compact(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(s)) => s,
        Ok(value) => value.to_string(),
        Err(_) => raw.to_string(),
    }
}

pub fn prefix_title_if_dlq(title: &str, is_dlq: bool, prefix: &str) -> String {
    if !is_dlq || title.starts_with(prefix) {
        return title.to_string();
    }
    format!("{} {}", prefix, title).trim().to_string()
}

/// Delivery metadata describing the current receive of `message`.
///
/// Missing delivery attributes are reported as empty strings.
pub fn base_enrichment(message: &InboundMessage) -> Map<String, Value> {
    let attribute =
        |key: &str| Value::String(message.attribute(key).unwrap_or_default().to_string());

    let mut props = Map::new();
    props.insert(
        "sqsMessageId".to_string(),
        Value::String(message.message_id.clone()),
    );
    props.insert(
        "queueArn".to_string(),
        Value::String(message.event_source_arn.clone()),
    );
    props.insert(
        "approximateReceiveCount".to_string(),
        attribute(APPROXIMATE_RECEIVE_COUNT),
    );
    props.insert("sentTimestamp".to_string(), attribute(SENT_TIMESTAMP));
    props.insert(
        "firstReceiveTimestamp".to_string(),
        attribute(FIRST_RECEIVE_TIMESTAMP),
    );
    props
}

/// Turns classified documents into events ready for delivery.
pub struct Enricher<'a> {
    config: &'a Config,
}

impl<'a> Enricher<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Builds the event for one record.
    ///
    /// `now` is the processing time in epoch millis and is used for every
    /// defaulted timestamp of the record. Fails only when a pre-formed body
    /// cannot be read back as a [`MonitoringEvent`].
    pub fn build(
        &self,
        document: Document,
        message: &InboundMessage,
        original_queue: Option<&str>,
        is_dlq: bool,
        now: i64,
    ) -> Result<MonitoringEvent, serde_json::Error> {
        match document {
            Document::PreFormed(map) => self.enrich(map, message, original_queue, is_dlq, now),
            Document::Raw { body, .. } => {
                Ok(self.synthesize(&body, message, original_queue, is_dlq, now))
            }
        }
    }

    /// Completes an event the producer already shaped.
    ///
    /// Existing properties are kept; only the delivery metadata keys and the
    /// original queue hint are overwritten. `startTime`, `endTime`, `timeout`
    /// and `entitySelector` are filled in only when the key is absent.
    ///
    /// # Arguments
    ///
    /// * `map` - The parsed body, classified as [`Document::PreFormed`]
    /// * `message` - The record the body came from, source of the delivery metadata
    /// * `original_queue` - The resolved original-queue hint, if any
    /// * `is_dlq` - Whether the title gets the configured DLQ prefix
    /// * `now` - Processing time in epoch millis
    ///
    /// # Errors
    ///
    /// Returns an error if a field has a type the ingest shape cannot hold,
    /// e.g. `"title": 42` or `"startTime": "yesterday"`.
    pub fn enrich(
        &self,
        mut map: Map<String, Value>,
        message: &InboundMessage,
        original_queue: Option<&str>,
        is_dlq: bool,
        now: i64,
    ) -> Result<MonitoringEvent, serde_json::Error> {
        if !matches!(map.get("properties"), Some(Value::Object(_))) {
            map.insert("properties".to_string(), Value::Object(Map::new()));
        }
        if let Some(Value::Object(props)) = map.get_mut("properties") {
            props.extend(base_enrichment(message));
            if let Some(queue) = original_queue {
                props.insert(
                    ORIGINAL_QUEUE_KEY.to_string(),
                    Value::String(queue.to_string()),
                );
            }
        }

        map.entry("startTime").or_insert_with(|| Value::from(now));
        map.entry("endTime").or_insert_with(|| Value::from(now));
        map.entry("timeout")
            .or_insert_with(|| Value::from(self.config.default_timeout_ms));
        if let Some(selector) = &self.config.default_entity_selector {
            map.entry("entitySelector")
                .or_insert_with(|| Value::String(selector.clone()));
        }

        if let Some(Value::String(title)) = map.get("title") {
            let title = truncate(title, self.config.title_max);
            let title = prefix_title_if_dlq(&title, is_dlq, &self.config.dlq_prefix);
            map.insert("title".to_string(), Value::String(title));
        }

        let mut event: MonitoringEvent = serde_json::from_value(Value::Object(map))?;
        if event.entity_selector.as_deref() == Some("") {
            event.entity_selector = None;
        }
        Ok(event)
    }

    /// Builds a fresh event around an opaque message body.
    ///
    /// The title is the compacted, truncated body; event type and timeout come
    /// from the configuration and both timestamps are `now`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dlq_events::{Config, Enricher, InboundMessage};
    ///
    /// # fn example(config: &Config) {
    /// let message = InboundMessage {
    ///     message_id: "059f36b4".to_string(),
    ///     body: "payment timed out".to_string(),
    ///     ..Default::default()
    /// };
    /// let event = Enricher::new(config).synthesize(&message.body, &message, None, true, 0);
    /// assert!(event.title.ends_with("payment timed out"));
    /// # }
    /// ```
    pub fn synthesize(
        &self,
        body: &str,
        message: &InboundMessage,
        original_queue: Option<&str>,
        is_dlq: bool,
        now: i64,
    ) -> MonitoringEvent {
        let title = truncate(&compact(body), self.config.title_max);

        let mut properties = base_enrichment(message);
        if let Some(queue) = original_queue {
            properties.insert(
                ORIGINAL_QUEUE_KEY.to_string(),
                Value::String(queue.to_string()),
            );
        }

        let entity_selector = if self.config.raw_entity_selector {
            self.config.default_entity_selector.clone()
        } else {
            None
        };

        MonitoringEvent {
            end_time: now,
            entity_selector,
            event_type: self.config.default_event_type.clone(),
            properties,
            start_time: now,
            timeout: self.config.default_timeout_ms,
            title: prefix_title_if_dlq(&title, is_dlq, &self.config.dlq_prefix),
        }
    }
}
