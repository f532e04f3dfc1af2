use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::decoder::{decode_reply_with_idle_timeout, ReplyStream};
use crate::error::StreamError;

/// Something that answers a user utterance with a streamed reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn ask(&self, message: &str) -> Result<ReplyStream, StreamError>;
}

/// Body of the outbound chat request
#[derive(Serialize)]
struct AskRequest<'a> {
    message: &'a str,
}

/// [`ChatBackend`] that POSTs `{ "message": ... }` to an HTTP endpoint and
/// decodes the `data:`-framed response body.
#[derive(Clone, Debug)]
pub struct HttpChatBackend {
    client: Client,
    url: String,
    idle_timeout: Option<Duration>,
}

impl HttpChatBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            idle_timeout: None,
        }
    }

    /// Build with a connect timeout. No total timeout is set on the client,
    /// because a reply may legitimately stream for a long time.
    pub fn with_connect_timeout(url: impl Into<String>, connect_timeout: Duration) -> Result<Self, StreamError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            idle_timeout: None,
        })
    }

    /// Fail the reply when the body stalls for longer than `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn ask(&self, message: &str) -> Result<ReplyStream, StreamError> {
        debug!(url = %self.url, len = message.len(), "Opening reply stream");
        let response = self
            .client
            .post(&self.url)
            .json(&AskRequest { message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_reply_with_idle_timeout(
            response.bytes_stream(),
            self.idle_timeout,
        ))
    }
}
