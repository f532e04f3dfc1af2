// Configuration for the companion front end

use std::time::Duration;

pub const DEFAULT_GREETING: &str = "Hello, I'm your companion. Ask me anything.";

#[derive(Clone, Debug, PartialEq)]
pub struct CompanionConfig {
    pub server_url: String,
    pub ask_path: String,
    pub speak_path: String,
    pub request_timeout_secs: u64,
    pub stream_idle_timeout_secs: u64,
    pub voice_output: bool,
    pub audio_player: Option<String>,
    pub stt_command: Option<String>,
    pub stt_language: String,
    pub greeting: Option<String>,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8085".to_string(),
            ask_path: "/api/ask".to_string(),
            speak_path: "/api/speak".to_string(),
            request_timeout_secs: 60,
            stream_idle_timeout_secs: 30,
            voice_output: true,
            audio_player: Some("mpg123 -q".to_string()),
            stt_command: None,
            stt_language: speech_core::DEFAULT_LANGUAGE.to_string(),
            greeting: Some(DEFAULT_GREETING.to_string()),
        }
    }
}

impl CompanionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values keep their
    /// defaults. An empty string clears the optional settings.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server_url = lookup("COMPANION_SERVER_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.server_url);

        let ask_path = lookup("COMPANION_ASK_PATH").unwrap_or(defaults.ask_path);
        let speak_path = lookup("COMPANION_SPEAK_PATH").unwrap_or(defaults.speak_path);

        let request_timeout_secs = lookup("COMPANION_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let stream_idle_timeout_secs = lookup("COMPANION_STREAM_IDLE_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.stream_idle_timeout_secs);

        let voice_output = lookup("COMPANION_VOICE_OUTPUT")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.voice_output);

        let audio_player = optional(lookup("COMPANION_AUDIO_PLAYER"), defaults.audio_player);
        let stt_command = optional(lookup("COMPANION_STT_COMMAND"), defaults.stt_command);
        let greeting = optional(lookup("COMPANION_GREETING"), defaults.greeting);

        let stt_language = lookup("COMPANION_STT_LANG")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.stt_language);

        Self {
            server_url,
            ask_path,
            speak_path,
            request_timeout_secs,
            stream_idle_timeout_secs,
            voice_output,
            audio_player,
            stt_command,
            stt_language,
            greeting,
        }
    }

    pub fn ask_url(&self) -> String {
        join_url(&self.server_url, &self.ask_path)
    }

    pub fn speak_url(&self) -> String {
        join_url(&self.server_url, &self.speak_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }
}

fn optional(value: Option<String>, default: Option<String>) -> Option<String> {
    match value {
        Some(v) if v.trim().is_empty() => None,
        Some(v) => Some(v),
        None => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
