//! Per-batch orchestration with per-record outcomes.

use std::sync::Arc;

use tokio::time::Instant;

use crate::cache::DlqStatusCache;
use crate::classify::{classify, Kind};
use crate::config::Config;
use crate::error::RecordError;
use crate::event::{Enricher, MonitoringEvent};
use crate::hint::resolve_original_queue;
use crate::ingest::EventSink;
use crate::inspector::{QueueInspector, QueueMetadata};
use crate::message::InboundMessage;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct BatchItemFailure {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}

/// Ids of the records that were not delivered, in batch order.
///
/// Serializes to the partial batch response understood by queue triggers.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchOutcome {
    #[serde(rename = "batchItemFailures")]
    failures: Vec<BatchItemFailure>,
}

impl BatchOutcome {
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|f| f.item_identifier.as_str())
            .collect()
    }

    pub fn is_failed(&self, message_id: &str) -> bool {
        self.failures.iter().any(|f| f.item_identifier == message_id)
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    fn record_failure(&mut self, message_id: &str) {
        if !self.is_failed(message_id) {
            self.failures.push(BatchItemFailure {
                item_identifier: message_id.to_string(),
            });
        }
    }
}

/// Turns batches of queue messages into delivered monitoring events.
pub struct BatchProcessor<M, S> {
    config: Config,
    inspector: QueueInspector<M>,
    sink: S,
}

impl<M: QueueMetadata, S: EventSink> BatchProcessor<M, S> {
    /// Creates a processor.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated settings, see [`Config::from_env`]
    /// * `metadata` - Queue metadata source used for DLQ detection
    /// * `sink` - Where built events are delivered
    /// * `cache` - DLQ status memo, shared by every processor of the process
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use dlq_events::{BatchProcessor, Config, DlqStatusCache, IngestClient, SqsQueues};
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let config = Config::from_env()?;
    /// let sdk_config = aws_config::load_from_env().await;
    /// let processor = BatchProcessor::new(
    ///     config.clone(),
    ///     SqsQueues::from_config(sdk_config),
    ///     IngestClient::from_config(&config)?,
    ///     Arc::new(DlqStatusCache::new()),
    /// );
    /// let outcome = processor.process(&[]).await;
    /// assert!(outcome.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: Config, metadata: M, sink: S, cache: Arc<DlqStatusCache>) -> Self {
        Self {
            config,
            inspector: QueueInspector::new(metadata, cache),
            sink,
        }
    }

    pub fn inspector(&self) -> &QueueInspector<M> {
        &self.inspector
    }

    pub async fn process(&self, batch: &[InboundMessage]) -> BatchOutcome {
        self.process_until(batch, None).await
    }

    /// Processes every record, stopping work at `deadline` if one is given.
    ///
    /// Records still in flight or not yet started when the deadline passes
    /// are reported as failed so they get redelivered.
    ///
    /// DLQ status is decided once from the first record's source queue and
    /// applied to the whole batch.
    ///
    /// # Arguments
    ///
    /// * `batch` - Records in delivery order
    /// * `deadline` - Instant after which unfinished records count as failed
    ///
    /// This never fails as a whole: every problem is confined to its record
    /// and shows up in the returned [`BatchOutcome`].
    pub async fn process_until(
        &self,
        batch: &[InboundMessage],
        deadline: Option<Instant>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let Some(first) = batch.first() else {
            return outcome;
        };

        let lookup = self.inspector.is_dead_letter_queue(&first.event_source_arn);
        let batch_is_dlq = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, lookup)
                .await
                .unwrap_or(false),
            None => lookup.await,
        };

        for message in batch {
            let result = match deadline {
                Some(deadline) if Instant::now() >= deadline => Err(RecordError::DeadlineExceeded),
                Some(deadline) => {
                    tokio::time::timeout_at(deadline, self.process_record(message, batch_is_dlq))
                        .await
                        .unwrap_or(Err(RecordError::DeadlineExceeded))
                }
                None => self.process_record(message, batch_is_dlq).await,
            };

            if let Err(e) = result {
                log::warn!("failed to forward message {}: {}", message.message_id, e);
                outcome.record_failure(&message.message_id);
            }
        }

        log::info!(
            "processed {} message(s), {} failed (dlq: {})",
            batch.len(),
            outcome.len(),
            batch_is_dlq
        );
        outcome
    }

    /// Classifies, enriches and sends a single record.
    pub async fn process_record(
        &self,
        message: &InboundMessage,
        batch_is_dlq: bool,
    ) -> Result<(), RecordError> {
        let event = self.build_event(message, batch_is_dlq)?;
        self.sink.send(&event).await?;
        Ok(())
    }

    /// Builds the event for `message` without sending it.
    pub fn build_event(
        &self,
        message: &InboundMessage,
        batch_is_dlq: bool,
    ) -> Result<MonitoringEvent, RecordError> {
        let now = chrono::Utc::now().timestamp_millis();
        let document = classify(&message.body);
        let original_queue = resolve_original_queue(
            message,
            document.parsed(),
            &self.config.original_queue_property,
        );
        // a hint means the message was redriven, whatever the queue says
        let is_dlq = batch_is_dlq || original_queue.is_some();

        log::debug!(
            "message {}: {:?} body, dlq={}, original queue={:?}",
            message.message_id,
            document.kind(),
            is_dlq,
            original_queue
        );
        if document.kind() == Kind::Raw {
            log::trace!("message {} body: {}", message.message_id, message.body);
        }

        let event = Enricher::new(&self.config).build(
            document,
            message,
            original_queue.as_deref(),
            is_dlq,
            now,
        )?;
        Ok(event)
    }
}
