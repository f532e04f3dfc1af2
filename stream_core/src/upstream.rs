use reqwest::{Client, Response};
use serde::Serialize;

use crate::error::StreamError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_MAX_TOKENS: u16 = 512;

/// Structure for the chat completions request
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u16,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// Only the streaming form is used: the response body is already framed as
/// `data:` lines and is handed back untouched so it can be relayed.
#[derive(Clone, Debug)]
pub struct UpstreamChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    system_prompt: String,
    max_tokens: u16,
}

impl UpstreamChatClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u16) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Start a streamed completion for a single user message.
    pub async fn open_stream(&self, user_message: &str) -> Result<Response, StreamError> {
        let url = format!("{}/chat/completions", self.base_url);
        let req_body = CompletionRequest {
            model: &self.model,
            messages: vec![
                Message { role: "system", content: &self.system_prompt },
                Message { role: "user", content: user_message },
            ],
            max_tokens: self.max_tokens,
            stream: true,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req_body)
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
        Ok(response)
    }
}
