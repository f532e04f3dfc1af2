// Configuration for the server

use std::time::Duration;

use speech_core::VoiceSettings;

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub llm_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: String,
    pub voice_id: String,
    pub voice_settings: VoiceSettings,
    pub openai_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_system_prompt: String,
    pub llm_max_tokens: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            llm_timeout_secs: 60,
            request_timeout_secs: 90,
            cors_allowed_origins: None,
            elevenlabs_api_key: None,
            elevenlabs_base_url: speech_core::DEFAULT_BASE_URL.to_string(),
            voice_id: speech_core::DEFAULT_VOICE_ID.to_string(),
            voice_settings: VoiceSettings::default(),
            openai_api_key: None,
            llm_base_url: stream_core::DEFAULT_BASE_URL.to_string(),
            llm_model: stream_core::DEFAULT_MODEL.to_string(),
            llm_system_prompt: stream_core::DEFAULT_SYSTEM_PROMPT.to_string(),
            llm_max_tokens: stream_core::DEFAULT_MAX_TOKENS,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = lookup("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let llm_timeout_secs = lookup("LLM_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.llm_timeout_secs);

        let request_timeout_secs = lookup("REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // An empty key counts as missing
        let elevenlabs_api_key = lookup("ELEVENLABS_API_KEY").filter(|k| !k.trim().is_empty());
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());

        let voice_settings = VoiceSettings {
            stability: lookup("VOICE_STABILITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.voice_settings.stability),
            similarity_boost: lookup("VOICE_SIMILARITY_BOOST")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.voice_settings.similarity_boost),
        };

        Self {
            port,
            llm_timeout_secs,
            request_timeout_secs,
            cors_allowed_origins,
            elevenlabs_api_key,
            elevenlabs_base_url: lookup("ELEVENLABS_BASE_URL").unwrap_or(defaults.elevenlabs_base_url),
            voice_id: lookup("ELEVENLABS_VOICE_ID").unwrap_or(defaults.voice_id),
            voice_settings,
            openai_api_key,
            llm_base_url: lookup("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: lookup("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_system_prompt: lookup("LLM_SYSTEM_PROMPT").unwrap_or(defaults.llm_system_prompt),
            llm_max_tokens: lookup("LLM_MAX_TOKENS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.llm_max_tokens),
        }
    }

    /// Whole-request limit. Always longer than the provider limit so a slow
    /// provider answers 504 rather than the generic 408.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(self.llm_timeout_secs + 1))
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8085);
        assert_eq!(config.request_timeout(), Duration::from_secs(90));
        assert_eq!(config.llm_timeout(), Duration::from_secs(60));
        assert_eq!(config.voice_id, "EXAVITQu4vr4xnSDxMaL");
        assert_eq!(config.voice_settings, VoiceSettings { stability: 0.5, similarity_boost: 0.75 });
        assert!(config.elevenlabs_api_key.is_none());
        assert!(config.openai_api_key.is_none());
        assert!(config.cors_allowed_origins.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("ELEVENLABS_API_KEY", "  "),
            ("OPENAI_API_KEY", "sk-live"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("VOICE_STABILITY", "0.3"),
            ("LLM_MAX_TOKENS", "lots"),
        ]);
        assert_eq!(config.port, 9000);
        assert!(config.elevenlabs_api_key.is_none());
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-live"));
        assert_eq!(
            config.cors_allowed_origins,
            Some(vec!["https://a.example".to_string(), "https://b.example".to_string()])
        );
        assert_eq!(config.voice_settings.stability, 0.3);
        assert_eq!(config.llm_max_tokens, stream_core::DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_request_timeout_outlasts_provider_timeout() {
        let config = config_from(&[("REQUEST_TIMEOUT_SECS", "10"), ("LLM_TIMEOUT_SECS", "30")]);
        assert_eq!(config.llm_timeout(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(31));
    }
}
