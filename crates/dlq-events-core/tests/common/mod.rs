#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use dlq_events::{
    Config, EventSink, InboundMessage, MonitoringEvent, QueueMetadata, SendError,
    APPROXIMATE_RECEIVE_COUNT, FIRST_RECEIVE_TIMESTAMP, SENT_TIMESTAMP,
};

pub const DLQ_ARN: &str = "arn:aws:sqs:us-east-1:000000000000:orders-dlq";
pub const MAIN_ARN: &str = "arn:aws:sqs:us-east-1:000000000000:orders";

pub fn config(ingest_base_url: &str) -> Config {
    Config {
        ingest_base_url: ingest_base_url.to_string(),
        api_token: "secret".to_string(),
        default_entity_selector: Some("type(SERVICE)".to_string()),
        default_event_type: "AVAILABILITY_EVENT".to_string(),
        default_timeout_ms: 0,
        title_max: 500,
        original_queue_property: "originalQueueArn".to_string(),
        dlq_prefix: "[DQL]".to_string(),
        raw_entity_selector: false,
        http_timeout: Duration::from_secs(10),
    }
}

pub fn message(id: &str, body: &str, queue_arn: &str) -> InboundMessage {
    InboundMessage {
        message_id: id.to_string(),
        body: body.to_string(),
        attributes: [
            (APPROXIMATE_RECEIVE_COUNT.to_string(), "1".to_string()),
            (SENT_TIMESTAMP.to_string(), "1700000000000".to_string()),
            (FIRST_RECEIVE_TIMESTAMP.to_string(), "1700000000100".to_string()),
        ]
        .into(),
        message_attributes: HashMap::new(),
        event_source_arn: queue_arn.to_string(),
    }
}

/// Answers DLQ lookups from a fixed table; unknown queues fail the lookup.
#[derive(Default)]
pub struct FakeMetadata {
    pub sources: HashMap<String, Vec<String>>,
    pub lookups: AtomicUsize,
}

impl FakeMetadata {
    pub fn with_dlq(queue_arn: &str) -> Self {
        let mut sources = HashMap::new();
        sources.insert(queue_arn.to_string(), vec![format!("https://sqs.local/{}", MAIN_ARN)]);
        sources.insert(MAIN_ARN.to_string(), Vec::new());
        Self {
            sources,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl QueueMetadata for FakeMetadata {
    async fn queue_url(&self, queue_arn: &str) -> anyhow::Result<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(self.sources.contains_key(queue_arn), "queue does not exist");
        Ok(queue_arn.to_string())
    }

    async fn dead_letter_sources(&self, queue_url: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.sources.get(queue_url).cloned().unwrap_or_default())
    }
}

/// Records every event and rejects the ones sent for `failing` message ids.
#[derive(Default)]
pub struct RecordingSink {
    pub failing: HashSet<String>,
    pub delay: Option<Duration>,
    pub events: Mutex<Vec<MonitoringEvent>>,
}

impl RecordingSink {
    pub fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| id.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<MonitoringEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl EventSink for RecordingSink {
    async fn send(&self, event: &MonitoringEvent) -> Result<(), SendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let id = event.properties["sqsMessageId"].as_str().unwrap_or_default();
        if self.failing.contains(id) {
            return Err(SendError::Status(500));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
