//! Scoped audio playback.
//!
//! Each utterance is written to its own temporary file, handed to a player,
//! and deleted when the [`PlaybackResource`] goes out of scope, whichever
//! way the caller leaves.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::error::SpeechError;

/// Audio bytes materialised for one playback.
#[derive(Debug)]
pub struct PlaybackResource {
    file: NamedTempFile,
}

impl PlaybackResource {
    pub fn acquire(audio: &[u8]) -> Result<Self, SpeechError> {
        let mut file = tempfile::Builder::new()
            .prefix("companion-speech-")
            .suffix(".mp3")
            .tempfile()?;
        file.write_all(audio)?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the file now and report failures. Dropping does the same
    /// silently.
    pub fn release(self) -> Result<(), SpeechError> {
        self.file.close()?;
        Ok(())
    }
}

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play the file at `path` to completion.
    async fn play(&self, path: &Path) -> Result<(), SpeechError>;
}

/// Player that accepts audio and does nothing with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlayer;

#[async_trait]
impl AudioPlayer for NullPlayer {
    async fn play(&self, _path: &Path) -> Result<(), SpeechError> {
        Ok(())
    }
}

/// Player backed by an external program, e.g. `mpg123 -q`. The file path is
/// passed as the last argument. The child is killed if the playback future
/// is dropped.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace-separated command line. `None` when it is blank.
    pub fn from_command_line(line: &str) -> Option<Self> {
        split_command_line(line).map(|(program, args)| Self::new(program, args))
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, path: &Path) -> Result<(), SpeechError> {
        debug!(program = %self.program.display(), file = %path.display(), "Starting playback");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(SpeechError::Player(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )))
        }
    }
}

pub(crate) fn split_command_line(line: &str) -> Option<(String, Vec<String>)> {
    let mut parts = line.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}
