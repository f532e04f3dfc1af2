//! Speech input.
//!
//! Recognition is optional. When no recogniser is configured the provider is
//! [`SpeechInputProvider::Unavailable`] and voice input is simply switched off.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::SpeechError;
use crate::playback::split_command_line;

pub const DEFAULT_LANGUAGE: &str = "en-US";

#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Listen for a single utterance and return its final transcript.
    /// `Ok(None)` means nothing was recognised.
    async fn recognize(&self) -> Result<Option<String>, SpeechError>;
}

/// Recogniser backed by an external speech-to-text program. The language tag
/// is passed as the last argument; the transcript is read from stdout.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: PathBuf,
    args: Vec<String>,
    language: String,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            language: language.into(),
        }
    }

    pub fn from_command_line(line: &str, language: &str) -> Option<Self> {
        split_command_line(line).map(|(program, args)| Self::new(program, args, language))
    }
}

#[async_trait]
impl Recognizer for CommandRecognizer {
    async fn recognize(&self) -> Result<Option<String>, SpeechError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.language)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SpeechError::Recognition(format!("{}: {e}", self.program.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::Recognition(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!transcript.is_empty()).then_some(transcript))
    }
}

/// Where voice input comes from, if anywhere.
#[derive(Clone, Default)]
pub enum SpeechInputProvider {
    Native(Arc<dyn Recognizer>),
    #[default]
    Unavailable,
}

impl SpeechInputProvider {
    /// `Native` when a non-blank command line is configured, otherwise
    /// `Unavailable`.
    pub fn from_command_line(line: Option<&str>, language: &str) -> Self {
        match line.and_then(|l| CommandRecognizer::from_command_line(l, language)) {
            Some(recognizer) => SpeechInputProvider::Native(Arc::new(recognizer)),
            None => SpeechInputProvider::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SpeechInputProvider::Native(_))
    }

    pub fn recognizer(&self) -> Option<Arc<dyn Recognizer>> {
        match self {
            SpeechInputProvider::Native(r) => Some(r.clone()),
            SpeechInputProvider::Unavailable => None,
        }
    }
}

impl std::fmt::Debug for SpeechInputProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechInputProvider::Native(_) => f.write_str("Native(<recognizer>)"),
            SpeechInputProvider::Unavailable => f.write_str("Unavailable"),
        }
    }
}
