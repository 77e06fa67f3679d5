//! # dlq-events-core
//!
//! Turns batches of SQS messages into monitoring events and delivers them to
//! an event ingest API, reporting failures per message.
//!
//! ## Features
//!
//! - **Classification**: bodies that already look like events are enriched,
//!   anything else becomes the title of a freshly built event
//! - **DLQ detection**: dead letter queues are recognised through
//!   `ListDeadLetterSourceQueues` (memoized) or an original-queue hint, and
//!   their event titles get a configurable prefix
//! - **Partial batch failures**: only the ids of undelivered messages are
//!   returned, so the caller redelivers just those
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dlq_events::{BatchProcessor, Config, DlqStatusCache, IngestClient, SqsEvent, SqsQueues};
//!
//! # async fn example(payload: &str) -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let aws = aws_config::from_env().load().await;
//!
//! let processor = BatchProcessor::new(
//!     config.clone(),
//!     SqsQueues::from_config(aws),
//!     IngestClient::from_config(&config)?,
//!     Arc::new(DlqStatusCache::new()),
//! );
//!
//! let event: SqsEvent = serde_json::from_str(payload)?;
//! let outcome = processor.process(&event.into_messages()).await;
//! println!("{}", serde_json::to_string(&outcome)?);
//! # Ok(())
//! # }
//! ```

mod cache;
mod classify;
mod config;
mod error;
mod event;
mod hint;
mod ingest;
mod inspector;
mod message;
mod processor;
mod sqs;

pub use cache::DlqStatusCache;
pub use classify::{classify, looks_like_event, Document, Kind, EVENT_KEYS};
pub use config::{Config, ConfigError, INGEST_PATH};
pub use error::RecordError;
pub use event::{
    base_enrichment, compact, prefix_title_if_dlq, truncate, Enricher, MonitoringEvent,
    ORIGINAL_QUEUE_KEY,
};
pub use hint::resolve_original_queue;
pub use ingest::{EventSink, IngestClient, SendError};
pub use inspector::{QueueArn, QueueInspector, QueueMetadata};
pub use message::{
    InboundMessage, SqsEvent, SqsMessageAttribute, SqsRecord, APPROXIMATE_RECEIVE_COUNT,
    FIRST_RECEIVE_TIMESTAMP, SENT_TIMESTAMP,
};
pub use processor::{BatchItemFailure, BatchOutcome, BatchProcessor};
pub use sqs::{receive, ForwardSummary, SqsQueues};
