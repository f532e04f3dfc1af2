use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("speech endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("speech endpoint returned no audio")]
    EmptyAudio,

    #[error("audio file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("player failed: {0}")]
    Player(String),

    #[error("speech recognition failed: {0}")]
    Recognition(String),
}
