use async_trait::async_trait;
use chaitr_config::{ClientSettings, ConnectionSettings};
use chaitr_core::{ChaitrError, Result};
use std::time::Duration;
use tracing::{debug, info, instrument};

pub mod wire;

use wire::ChatRequest;

/// What a reachable backend said about a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Reply(String),
    ServerError(String),
}

impl ChatOutcome {
    /// The reply text, or the backend's own error as `ServerReported`.
    pub fn into_reply(self) -> Result<String> {
        match self {
            ChatOutcome::Reply(reply) => Ok(reply),
            ChatOutcome::ServerError(error) => Err(ChaitrError::ServerReported(error)),
        }
    }
}

/// One request/response exchange with the chat backend.
///
/// Transport problems (unreachable host, timeout, unusable body) come back as
/// `ChaitrError::TransportFailure`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn exchange(&self, settings: &ConnectionSettings, message: &str) -> Result<ChatOutcome>;
}

pub struct HttpChatBackend {
    client: reqwest::Client,
}

impl HttpChatBackend {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            info!("Using request timeout of {}s", secs);
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| ChaitrError::TransportFailure(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    #[instrument(skip(self, message), fields(url = %settings.chat_url()))]
    async fn exchange(&self, settings: &ConnectionSettings, message: &str) -> Result<ChatOutcome> {
        let response = self
            .client
            .post(settings.chat_url())
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| ChaitrError::TransportFailure(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChaitrError::TransportFailure(e.to_string()))?;

        debug!("Backend answered HTTP {} ({} bytes)", status, body.len());
        wire::interpret(status.as_u16(), &body)
    }
}
