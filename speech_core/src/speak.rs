use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::SpeechError;
use crate::playback::{AudioPlayer, PlaybackResource};

/// Something that can say a finished reply out loud.
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

#[derive(Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
}

/// Client for the server's speak endpoint (`POST { text }` -> `audio/mpeg`).
#[derive(Clone, Debug)]
pub struct SpeakClient {
    client: Client,
    url: String,
}

impl SpeakClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, SpeechError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn fetch_audio(&self, text: &str) -> Result<Bytes, SpeechError> {
        let response = self
            .client
            .post(&self.url)
            .json(&SpeakRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?)
    }
}

/// Fetches audio for a reply and plays it through an [`AudioPlayer`].
#[derive(Clone)]
pub struct VoiceOutput {
    client: SpeakClient,
    player: Arc<dyn AudioPlayer>,
}

impl VoiceOutput {
    pub fn new(client: SpeakClient, player: Arc<dyn AudioPlayer>) -> Self {
        Self { client, player }
    }
}

#[async_trait]
impl Speaker for VoiceOutput {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let audio = self.client.fetch_audio(text).await?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        debug!(bytes = audio.len(), "Received speech audio");

        let resource = PlaybackResource::acquire(&audio)?;
        let played = self.player.play(resource.path()).await;
        if let Err(e) = resource.release() {
            warn!(error = %e, "Failed to release playback file");
        }
        played
    }
}
