//! Delivery of monitoring events to the ingest API.

use std::fmt;

use crate::config::Config;
use crate::event::MonitoringEvent;

#[derive(Debug)]
pub enum SendError {
    /// The endpoint answered with a non-2xx status.
    Status(u16),
    /// The request never produced a response (DNS, TLS, timeout, ...).
    Transport(reqwest::Error),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Status(status) => write!(f, "event ingest failed: status={}", status),
            SendError::Transport(e) => write!(f, "event ingest http error: {}", e),
        }
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SendError::Status(_) => None,
            SendError::Transport(e) => Some(e),
        }
    }
}

/// Destination for finished events.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: &MonitoringEvent) -> Result<(), SendError>;
}

/// POSTs events as JSON to `<base>/api/v2/events/ingest`.
#[derive(Clone, Debug)]
pub struct IngestClient {
    http: reqwest::Client,
    url: String,
    authorization: String,
}

impl IngestClient {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            url: config.ingest_url(),
            authorization: format!("Api-Token {}", config.api_token),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl EventSink for IngestClient {
    async fn send(&self, event: &MonitoringEvent) -> Result<(), SendError> {
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .json(event)
            .send()
            .await
            .map_err(SendError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    async fn send(&self, event: &MonitoringEvent) -> Result<(), SendError> {
        (**self).send(event).await
    }
}
