//! SQS client wrapper used for dead letter queue lookups and queue polling.

use std::collections::HashMap;

use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_sqs as sqs;
use sqs::types::{
    DeleteMessageBatchRequestEntry, MessageSystemAttributeName, QueueAttributeName,
};

use crate::ingest::EventSink;
use crate::inspector::{QueueArn, QueueMetadata};
use crate::message::InboundMessage;
use crate::processor::BatchProcessor;

/// Receives messages from an SQS queue.
///
/// Retrieves up to 10 messages at a time with a 15-second visibility timeout,
/// including every system and custom attribute.
///
/// # Errors
///
/// Returns an error if the SQS API call fails.
pub async fn receive(
    client: &sqs::Client,
    queue_url: &str,
) -> anyhow::Result<sqs::operation::receive_message::ReceiveMessageOutput> {
    let result = client
        .receive_message()
        .queue_url(queue_url)
        .max_number_of_messages(10)
        .visibility_timeout(15)
        .message_system_attribute_names(MessageSystemAttributeName::All)
        .message_attribute_names("All")
        .send()
        .await;

    result.context("failed to receive messages")
}

/// Counts from one [`SqsQueues::forward`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ForwardSummary {
    pub received: usize,
    pub forwarded: usize,
    pub failed: usize,
}

/// Client for the SQS calls this crate makes.
///
/// Answers the dead letter queue lookups of the
/// [`QueueInspector`](crate::inspector::QueueInspector) and can drain a queue
/// through a [`BatchProcessor`].
#[derive(Clone, Debug)]
pub struct SqsQueues {
    /// The AWS SDK configuration used for SQS operations
    pub config: SdkConfig,
    /// The SQS client instance
    pub client: sqs::Client,
}

impl SqsQueues {
    /// Creates the client from a pre-built AWS SDK config.
    ///
    /// The caller decides credentials and endpoints (e.g. LocalStack with `--local`).
    pub fn from_config(config: SdkConfig) -> Self {
        let client = sqs::Client::new(&config);
        Self { config, client }
    }

    /// Looks up the ARN of the queue behind `queue_url`.
    pub async fn queue_arn(&self, queue_url: &str) -> anyhow::Result<String> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::QueueArn)
            .send()
            .await
            .with_context(|| format!("failed to get attributes of {}", queue_url))?;

        output
            .attributes()
            .and_then(|attributes| attributes.get(&QueueAttributeName::QueueArn))
            .cloned()
            .with_context(|| format!("no QueueArn attribute for {}", queue_url))
    }

    /// Deletes the given `(message_id, receipt_handle)` pairs in one call.
    ///
    /// Returns how many deletes SQS reported as failed.
    ///
    /// # Arguments
    ///
    /// * `queue_url` - URL of the queue the messages were received from
    /// * `messages` - At most 10 `(message_id, receipt_handle)` pairs
    ///
    /// # Errors
    ///
    /// Returns an error if the batch request itself fails. Entries SQS rejects
    /// individually are logged and counted instead.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(queues: dlq_events::SqsQueues, url: &str) -> anyhow::Result<()> {
    /// let failed = queues.delete(url, &[("059f36b4", "AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a")]).await?;
    /// assert_eq!(failed, 0);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn delete(&self, queue_url: &str, messages: &[(&str, &str)]) -> anyhow::Result<usize> {
        if messages.is_empty() {
            return Ok(0);
        }

        let entries = messages
            .iter()
            .enumerate()
            .map(|(i, (_, receipt_handle))| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(i.to_string())
                    .receipt_handle(*receipt_handle)
                    .build()
                    .context("failed to build delete entry")
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .context("failed to delete messages")?;

        for failure in output.failed() {
            let message_id = failure
                .id()
                .parse::<usize>()
                .ok()
                .and_then(|i| messages.get(i))
                .map(|(id, _)| *id)
                .unwrap_or("?");
            log::warn!(
                "could not delete message {}: {}",
                message_id,
                failure.message().unwrap_or(failure.code())
            );
        }

        Ok(output.failed().len())
    }

    /// Drains a queue through `processor`.
    ///
    /// Receives until the queue looks empty or `max_receives` batches were
    /// read. Successfully forwarded messages are deleted; failed ones are
    /// left to become visible again.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue ARN cannot be read or a receive or
    /// delete call fails. Failed records are not errors; they are counted in
    /// [`ForwardSummary::failed`].
    pub async fn forward<M, S>(
        &self,
        queue_url: &str,
        processor: &BatchProcessor<M, S>,
        max_receives: usize,
    ) -> anyhow::Result<ForwardSummary>
    where
        M: QueueMetadata,
        S: EventSink,
    {
        let queue_arn = self.queue_arn(queue_url).await?;
        let mut summary = ForwardSummary::default();

        for _ in 0..max_receives {
            let output = receive(&self.client, queue_url).await?;

            // if none, that suggests the whole queue has been received recently
            let Some(messages) = output.messages else {
                break;
            };
            if messages.is_empty() {
                break;
            }

            let mut receipts = HashMap::new();
            let mut batch = Vec::with_capacity(messages.len());
            for message in messages {
                let receipt_handle = message.receipt_handle.clone();
                let Some(inbound) = InboundMessage::from_aws_message(message, &queue_arn) else {
                    log::warn!("skipping message without id");
                    continue;
                };
                if let Some(receipt_handle) = receipt_handle {
                    receipts.insert(inbound.message_id.clone(), receipt_handle);
                }
                batch.push(inbound);
            }

            let outcome = processor.process(&batch).await;

            let done: Vec<(&str, &str)> = batch
                .iter()
                .filter(|m| !outcome.is_failed(&m.message_id))
                .filter_map(|m| {
                    receipts
                        .get(&m.message_id)
                        .map(|r| (m.message_id.as_str(), r.as_str()))
                })
                .collect();
            self.delete(queue_url, &done).await?;

            summary.received += batch.len();
            summary.failed += outcome.len();
            summary.forwarded += batch.len() - outcome.len();
        }

        log::info!(
            "forwarded {} of {} message(s) from {}",
            summary.forwarded,
            summary.received,
            queue_url
        );
        Ok(summary)
    }
}

#[async_trait::async_trait]
impl QueueMetadata for SqsQueues {
    async fn queue_url(&self, queue_arn: &str) -> anyhow::Result<String> {
        let arn = QueueArn::parse(queue_arn)
            .with_context(|| format!("not an SQS queue ARN: {}", queue_arn))?;

        let output = self
            .client
            .get_queue_url()
            .queue_name(arn.name)
            .queue_owner_aws_account_id(arn.account)
            .send()
            .await
            .with_context(|| format!("failed to get queue url for {}", queue_arn))?;

        output
            .queue_url()
            .map(str::to_string)
            .with_context(|| format!("no queue url returned for {}", queue_arn))
    }

    async fn dead_letter_sources(&self, queue_url: &str) -> anyhow::Result<Vec<String>> {
        let output = self
            .client
            .list_dead_letter_source_queues()
            .queue_url(queue_url)
            .max_results(10)
            .send()
            .await
            .with_context(|| format!("failed to list dead letter sources of {}", queue_url))?;

        Ok(output.queue_urls().to_vec())
    }
}
