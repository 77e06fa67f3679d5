//! Inbound queue messages and the adapters that produce them.

use std::collections::HashMap;

/// Delivery attribute carrying how many times the message has been received.
pub const APPROXIMATE_RECEIVE_COUNT: &str = "ApproximateReceiveCount";
/// Delivery attribute carrying the epoch millis the message was sent.
pub const SENT_TIMESTAMP: &str = "SentTimestamp";
/// Delivery attribute carrying the epoch millis of the first receive.
pub const FIRST_RECEIVE_TIMESTAMP: &str = "ApproximateFirstReceiveTimestamp";

/// One record of an incoming batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InboundMessage {
    /// Unique identifier for the message assigned by SQS
    pub message_id: String,
    /// The actual message content, possibly JSON
    pub body: String,
    /// System (delivery) attributes such as `ApproximateReceiveCount`
    pub attributes: HashMap<String, String>,
    /// Custom message attributes that carry a string value
    pub message_attributes: HashMap<String, String>,
    /// ARN of the queue the batch was read from
    pub event_source_arn: String,
}

impl InboundMessage {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn message_attribute(&self, key: &str) -> Option<&str> {
        self.message_attributes.get(key).map(String::as_str)
    }

    /// Converts a message received through the SDK.
    ///
    /// The SDK response does not carry the source queue, so the caller passes
    /// the ARN it resolved for the polled queue. Returns `None` for messages
    /// without an id, which cannot be acknowledged or reported anyway.
    pub fn from_aws_message(message: aws_sdk_sqs::types::Message, queue_arn: &str) -> Option<Self> {
        let attributes = message
            .attributes
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.as_str().to_string(), value))
            .collect();

        let message_attributes = message
            .message_attributes
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, value)| value.string_value.map(|s| (name, s)))
            .collect();

        Some(Self {
            message_id: message.message_id?,
            body: message.body.unwrap_or_default(),
            attributes,
            message_attributes,
            event_source_arn: queue_arn.to_string(),
        })
    }
}

/// Queue-triggered invocation payload, as delivered by the Lambda event source mapping.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsRecord>,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsRecord {
    pub message_id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub message_attributes: HashMap<String, SqsMessageAttribute>,
    #[serde(rename = "eventSourceARN", default)]
    pub event_source_arn: String,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsMessageAttribute {
    pub string_value: Option<String>,
    pub data_type: Option<String>,
}

impl From<SqsRecord> for InboundMessage {
    fn from(record: SqsRecord) -> Self {
        Self {
            message_id: record.message_id,
            body: record.body,
            attributes: record.attributes,
            message_attributes: record
                .message_attributes
                .into_iter()
                .filter_map(|(name, value)| value.string_value.map(|s| (name, s)))
                .collect(),
            event_source_arn: record.event_source_arn,
        }
    }
}

impl SqsEvent {
    pub fn into_messages(self) -> Vec<InboundMessage> {
        self.records.into_iter().map(InboundMessage::from).collect()
    }
}
