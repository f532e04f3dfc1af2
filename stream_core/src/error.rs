use thiserror::Error;

/// Failures while opening or reading a streamed reply.
///
/// Malformed event lines are not errors: the decoder logs and skips them.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("stream error: {0}")]
    Other(String),
}

impl StreamError {
    /// Every variant is recoverable from the caller's point of view; the
    /// distinction only matters for logging.
    pub fn is_timeout(&self) -> bool {
        match self {
            StreamError::Timeout(_) => true,
            StreamError::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl From<std::convert::Infallible> for StreamError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}
