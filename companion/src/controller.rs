use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures::StreamExt;
use speech_core::{Speaker, SpeechInputProvider};
use stream_core::{ChatBackend, StreamError, StreamEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::{Action, ChatState, Rejected};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Input was empty or whitespace; nothing happened.
    Ignored,
    /// A reply is already in progress; nothing happened.
    Busy,
    Completed { reply: String },
    Failed { error: String },
    /// The controller was shut down mid-reply.
    Cancelled,
}

/// Owns the chat state and drives one request/response cycle at a time.
///
/// State is published through a [`watch`] channel; renderers subscribe and
/// never mutate it.
pub struct ChatController {
    state: watch::Sender<ChatState>,
    backend: Arc<dyn ChatBackend>,
    speaker: Option<Arc<dyn Speaker>>,
    speech_input: SpeechInputProvider,
    request_timeout: Duration,
    shutdown: watch::Sender<bool>,
    listener: Mutex<Option<JoinHandle<()>>>,
    playback: Mutex<Option<JoinHandle<()>>>,
}

impl ChatController {
    pub fn new(backend: Arc<dyn ChatBackend>, initial: ChatState) -> Self {
        let (state, _) = watch::channel(initial);
        let (shutdown, _) = watch::channel(false);
        Self {
            state,
            backend,
            speaker: None,
            speech_input: SpeechInputProvider::Unavailable,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown,
            listener: Mutex::new(None),
            playback: Mutex::new(None),
        }
    }

    pub fn with_speaker(mut self, speaker: Arc<dyn Speaker>) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn with_speech_input(mut self, provider: SpeechInputProvider) -> Self {
        self.speech_input = provider;
        self
    }

    /// Upper bound on waiting for the reply stream to open.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    pub fn speech_input_available(&self) -> bool {
        self.speech_input.is_available()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.dispatch(Action::SetInput(text.into()));
    }

    pub fn append_input(&self, text: impl Into<String>) {
        self.dispatch(Action::AppendInput(text.into()));
    }

    /// Flip spoken replies on or off and return the new setting. Turning it
    /// off silences a reply that is still playing.
    pub fn toggle_voice_output(&self) -> bool {
        self.dispatch(Action::ToggleVoiceOutput);
        let enabled = self.state.borrow().voice_output;
        if !enabled {
            abort_task(&self.playback);
        }
        enabled
    }

    /// Submit the current input and drive the reply to completion. Speaking
    /// the reply continues in the background after this returns.
    pub async fn submit(&self) -> SubmitOutcome {
        let mut rejected = None;
        let mut message = String::new();
        self.state.send_if_modified(|state| match state.apply(Action::Submit) {
            Ok(()) => {
                message = state.pending_request().unwrap_or_default().to_string();
                true
            }
            Err(reason) => {
                rejected = Some(reason);
                false
            }
        });
        match rejected {
            Some(Rejected::EmptyInput) => return SubmitOutcome::Ignored,
            Some(reason) => {
                debug!(%reason, "Submission refused");
                return SubmitOutcome::Busy;
            }
            None => {}
        }

        info!(len = message.len(), "Submitting message");
        let outcome = tokio::select! {
            outcome = self.drive_reply(&message) => outcome,
            _ = wait_for_shutdown(self.shutdown.subscribe()) => {
                self.dispatch(Action::Fail("cancelled".to_string()));
                return SubmitOutcome::Cancelled;
            }
        };

        if let SubmitOutcome::Completed { reply } = &outcome {
            self.speak(reply);
        }
        outcome
    }

    async fn drive_reply(&self, message: &str) -> SubmitOutcome {
        let opened = tokio::time::timeout(self.request_timeout, self.backend.ask(message)).await;
        let mut stream = match opened {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return self.fail(e),
            Err(_) => return self.fail(StreamError::Timeout(self.request_timeout.as_secs())),
        };
        self.dispatch(Action::StreamOpened);

        let mut reply = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(StreamEvent::Token(token)) => {
                    reply.push_str(&token);
                    self.dispatch(Action::Token(token));
                }
                Ok(StreamEvent::Done) => break,
                Err(e) => return self.fail(e),
            }
        }
        drop(stream);

        self.dispatch(Action::Finish);
        info!(len = reply.len(), "Reply complete");
        SubmitOutcome::Completed { reply }
    }

    fn fail(&self, error: StreamError) -> SubmitOutcome {
        warn!(error = %error, timeout = error.is_timeout(), "Failed to get a reply");
        let error = error.to_string();
        self.dispatch(Action::Fail(error.clone()));
        SubmitOutcome::Failed { error }
    }

    /// Start speaking a finished reply, replacing any reply still playing.
    /// Failures are logged and otherwise ignored.
    fn speak(&self, reply: &str) {
        let Some(speaker) = self.speaker.clone() else {
            return;
        };
        if !self.state.borrow().voice_output || reply.trim().is_empty() {
            return;
        }
        let reply = reply.to_string();
        let shutdown = self.shutdown.subscribe();
        let task = tokio::spawn(async move {
            tokio::select! {
                result = speaker.speak(&reply) => {
                    if let Err(e) = result {
                        warn!(error = %e, "Voice playback error");
                    }
                }
                _ = wait_for_shutdown(shutdown) => {
                    debug!("Playback interrupted by shutdown");
                }
            }
        });

        let mut playback = self.playback.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = playback.replace(task) {
            previous.abort();
        }
    }

    /// Wait until the reply currently being spoken, if any, has finished.
    pub async fn finish_speaking(&self) {
        let task = self.playback.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Start or stop listening for one spoken utterance. Returns whether the
    /// controller is listening afterwards; always `false` when speech input
    /// is unavailable.
    pub fn toggle_listening(self: &Arc<Self>) -> bool {
        let Some(recognizer) = self.speech_input.recognizer() else {
            debug!("Speech input unavailable");
            return false;
        };

        let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if self.state.borrow().listening {
            if let Some(task) = listener.take() {
                task.abort();
            }
            self.dispatch(Action::SetListening(false));
            return false;
        }

        self.dispatch(Action::SetListening(true));
        let controller: Weak<Self> = Arc::downgrade(self);
        *listener = Some(tokio::spawn(async move {
            let result = recognizer.recognize().await;
            let Some(controller) = controller.upgrade() else {
                return;
            };
            match result {
                Ok(Some(transcript)) => {
                    debug!(len = transcript.len(), "Recognised speech");
                    controller.dispatch(Action::AppendInput(transcript));
                }
                Ok(None) => debug!("Nothing recognised"),
                Err(e) => warn!(error = %e, "Speech recognition error"),
            }
            controller.dispatch(Action::SetListening(false));
        }));
        true
    }

    /// Abort everything in flight: the reply stream, playback and listening.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        abort_task(&self.listener);
        abort_task(&self.playback);
        self.dispatch(Action::SetListening(false));
    }

    fn dispatch(&self, action: Action) {
        self.state.send_if_modified(|state| match state.apply(action) {
            Ok(()) => true,
            Err(reason) => {
                debug!(%reason, "Transition rejected");
                false
            }
        });
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        abort_task(&self.listener);
        abort_task(&self.playback);
    }
}

fn abort_task(slot: &Mutex<Option<JoinHandle<()>>>) {
    if let Some(task) = slot.lock().unwrap_or_else(|e| e.into_inner()).take() {
        task.abort();
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
