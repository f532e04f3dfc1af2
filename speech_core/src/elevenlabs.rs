use reqwest::{Client, Response};
use serde::Serialize;

use crate::error::SpeechError;

pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice_settings: VoiceSettings,
}

/// Client for the ElevenLabs streaming text-to-speech endpoint.
#[derive(Clone, Debug)]
pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    base_url: String,
    voice_id: String,
    settings: VoiceSettings,
}

impl ElevenLabsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            settings: VoiceSettings::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn with_settings(mut self, settings: VoiceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    /// Request speech for `text`. The response body is `audio/mpeg` and is
    /// returned unread so callers can relay it as it arrives.
    pub async fn synthesize(&self, text: &str) -> Result<Response, SpeechError> {
        let url = format!("{}/v1/text-to-speech/{}/stream", self.base_url, self.voice_id);
        let response = self
            .client
            .post(url)
            .header("xi-api-key", &self.api_key)
            .json(&SynthesisRequest {
                text,
                voice_settings: self.settings,
            })
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
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_synthesize_sends_key_and_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v1/text-to-speech/{DEFAULT_VOICE_ID}/stream")))
            .and(header("xi-api-key", "xi-test"))
            .and(body_json(json!({
                "text": "hello",
                "voice_settings": { "stability": 0.5, "similarity_boost": 0.75 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0xffu8, 0xfb, 0x90], "audio/mpeg"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ElevenLabsClient::new("xi-test").with_base_url(server.uri());
        let response = client.synthesize("hello").await.unwrap();
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "audio/mpeg"
        );
        assert_eq!(response.bytes().await.unwrap().as_ref(), &[0xff, 0xfb, 0x90]);
    }

    #[tokio::test]
    async fn test_synthesize_custom_voice_and_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/custom/stream"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let client = ElevenLabsClient::new("bad")
            .with_base_url(format!("{}/", server.uri()))
            .with_voice_id("custom");
        match client.synthesize("hello").await {
            Err(SpeechError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid key");
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.status())),
        }
    }
}
