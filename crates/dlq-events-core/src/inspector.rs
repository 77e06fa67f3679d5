//! Dead letter queue detection for the queue a batch was read from.

use std::sync::Arc;

use crate::cache::DlqStatusCache;

/// Queue metadata lookups needed to tell whether a queue is a dead letter queue.
#[async_trait::async_trait]
pub trait QueueMetadata: Send + Sync {
    /// Resolves a queue ARN to the URL the queue API expects.
    async fn queue_url(&self, queue_arn: &str) -> anyhow::Result<String>;

    /// URLs of the queues whose redrive policy points at `queue_url`.
    async fn dead_letter_sources(&self, queue_url: &str) -> anyhow::Result<Vec<String>>;
}

/// Parts of an `arn:aws:sqs:REGION:ACCOUNT:NAME` queue ARN needed to look
/// the queue up; the region comes from the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueArn<'a> {
    pub account: &'a str,
    pub name: &'a str,
}

impl<'a> QueueArn<'a> {
    pub fn parse(arn: &'a str) -> Option<Self> {
        let mut parts = arn.split(':');
        let (_arn, _partition, _service, _region) =
            (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        let account = parts.next()?;
        let name = parts.next().filter(|n| !n.is_empty())?;
        Some(Self { account, name })
    }
}

pub struct QueueInspector<M> {
    metadata: M,
    cache: Arc<DlqStatusCache>,
}

impl<M: QueueMetadata> QueueInspector<M> {
    pub fn new(metadata: M, cache: Arc<DlqStatusCache>) -> Self {
        Self { metadata, cache }
    }

    pub fn cache(&self) -> &DlqStatusCache {
        &self.cache
    }

    /// Reports whether `queue_arn` is the dead letter queue of some other queue.
    ///
    /// Lookup failures count as "not a DLQ" and are cached like any other
    /// answer, so a failing queue API is hit at most once per queue.
    pub async fn is_dead_letter_queue(&self, queue_arn: &str) -> bool {
        if queue_arn.is_empty() {
            return false;
        }

        if let Some(is_dlq) = self.cache.get(queue_arn) {
            return is_dlq;
        }

        let is_dlq = match self.lookup(queue_arn).await {
            Ok(sources) => {
                log::debug!(
                    "{} has {} dead letter source queue(s)",
                    queue_arn,
                    sources.len()
                );
                !sources.is_empty()
            }
            Err(e) => {
                log::warn!(
                    "could not tell whether {} is a dead letter queue, assuming it is not: {:#}",
                    queue_arn,
                    e
                );
                false
            }
        };

        self.cache.set(queue_arn, is_dlq);
        is_dlq
    }

    async fn lookup(&self, queue_arn: &str) -> anyhow::Result<Vec<String>> {
        let url = self.metadata.queue_url(queue_arn).await?;
        self.metadata.dead_letter_sources(&url).await
    }
}
