//! Chat session state and its transitions.
//!
//! Everything here is synchronous and free of I/O: the controller feeds
//! [`Action`]s in and publishes the resulting snapshots.

use thiserror::Error;

/// Shown in place of a reply when the request cycle fails.
pub const FAILED_REPLY: &str = "Sorry, I failed to respond. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { sender: Sender::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { sender: Sender::Assistant, text: text.into() }
    }
}

/// Where the session is in the request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Request sent, stream not open yet
    Awaiting,
    /// Tokens are arriving
    Streaming,
}

#[derive(Debug, Clone)]
pub enum Action {
    SetInput(String),
    /// Append text to the input, separated by one space from what is there.
    AppendInput(String),
    Submit,
    StreamOpened,
    Token(String),
    Finish,
    Fail(String),
    ToggleVoiceOutput,
    SetListening(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("input is empty")]
    EmptyInput,
    #[error("a reply is already in progress")]
    Busy,
    #[error("no reply is in progress")]
    NotResponding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatState {
    pub messages: Vec<Message>,
    pub input: String,
    pub phase: Phase,
    pub voice_output: bool,
    pub listening: bool,
    pub last_error: Option<String>,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new(None, true)
    }
}

impl ChatState {
    pub fn new(greeting: Option<&str>, voice_output: bool) -> Self {
        Self {
            messages: greeting.map(Message::assistant).into_iter().collect(),
            input: String::new(),
            phase: Phase::Idle,
            voice_output,
            listening: false,
            last_error: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The user utterance of the reply in progress.
    pub fn pending_request(&self) -> Option<&str> {
        if !self.is_busy() || self.messages.len() < 2 {
            return None;
        }
        let request = &self.messages[self.messages.len() - 2];
        (request.sender == Sender::User).then_some(request.text.as_str())
    }

    pub fn apply(&mut self, action: Action) -> Result<(), Rejected> {
        match action {
            Action::SetInput(text) => {
                self.input = text;
            }
            Action::AppendInput(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(());
                }
                if self.input.trim().is_empty() {
                    self.input = text.to_string();
                } else {
                    self.input = format!("{} {}", self.input.trim_end(), text);
                }
            }
            Action::Submit => {
                let text = self.input.trim();
                if text.is_empty() {
                    return Err(Rejected::EmptyInput);
                }
                if self.is_busy() {
                    return Err(Rejected::Busy);
                }
                let message = Message::user(text);
                self.messages.push(message);
                self.input.clear();
                self.last_error = None;
                self.phase = Phase::Awaiting;
                self.messages.push(Message::assistant(""));
            }
            Action::StreamOpened => {
                if self.phase != Phase::Awaiting {
                    return Err(Rejected::NotResponding);
                }
                self.phase = Phase::Streaming;
            }
            Action::Token(token) => {
                if !self.is_busy() {
                    return Err(Rejected::NotResponding);
                }
                self.phase = Phase::Streaming;
                if let Some(reply) = self.messages.last_mut() {
                    reply.text.push_str(&token);
                }
            }
            Action::Finish => {
                if !self.is_busy() {
                    return Err(Rejected::NotResponding);
                }
                self.phase = Phase::Idle;
            }
            Action::Fail(reason) => {
                if !self.is_busy() {
                    return Err(Rejected::NotResponding);
                }
                match self.messages.last_mut() {
                    Some(reply) if reply.sender == Sender::Assistant && reply.text.is_empty() => {
                        reply.text = FAILED_REPLY.to_string();
                    }
                    _ => self.messages.push(Message::assistant(FAILED_REPLY)),
                }
                self.last_error = Some(reason);
                self.phase = Phase::Idle;
            }
            Action::ToggleVoiceOutput => {
                self.voice_output = !self.voice_output;
            }
            Action::SetListening(listening) => {
                self.listening = listening;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted(text: &str) -> ChatState {
        let mut state = ChatState::new(Some("Hello"), true);
        state.apply(Action::SetInput(text.to_string())).unwrap();
        state.apply(Action::Submit).unwrap();
        state
    }

    #[test]
    fn test_submit_appends_user_and_placeholder() {
        let state = submitted("  ping  ");
        assert_eq!(
            state.messages,
            vec![
                Message::assistant("Hello"),
                Message::user("ping"),
                Message::assistant(""),
            ]
        );
        assert_eq!(state.input, "");
        assert_eq!(state.phase, Phase::Awaiting);
        assert_eq!(state.pending_request(), Some("ping"));
    }

    #[test]
    fn test_submit_whitespace_is_rejected_without_changes() {
        let mut state = ChatState::new(None, true);
        state.apply(Action::SetInput(" \t\n".to_string())).unwrap();
        let before = state.clone();
        assert_eq!(state.apply(Action::Submit), Err(Rejected::EmptyInput));
        assert_eq!(state, before);
    }

    #[test]
    fn test_submit_while_busy_is_rejected() {
        let mut state = submitted("first");
        state.apply(Action::SetInput("second".to_string())).unwrap();
        assert_eq!(state.apply(Action::Submit), Err(Rejected::Busy));
        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.input, "second");
    }

    #[test]
    fn test_tokens_extend_reply_monotonically() {
        let mut state = submitted("ping");
        state.apply(Action::StreamOpened).unwrap();
        let mut previous = String::new();
        for token in ["po", "n", "", "g"] {
            state.apply(Action::Token(token.to_string())).unwrap();
            let text = &state.last_message().unwrap().text;
            assert!(text.starts_with(&previous));
            previous = text.clone();
        }
        assert_eq!(previous, "pong");
        assert_eq!(state.phase, Phase::Streaming);

        state.apply(Action::Finish).unwrap();
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.pending_request(), None);
    }

    #[test]
    fn test_token_when_idle_is_rejected() {
        let mut state = ChatState::new(None, true);
        assert_eq!(
            state.apply(Action::Token("x".to_string())),
            Err(Rejected::NotResponding)
        );
        assert_eq!(state.apply(Action::Finish), Err(Rejected::NotResponding));
        assert!(state.messages.is_empty());
    }

    #[test]
    fn test_fail_replaces_empty_placeholder() {
        let mut state = submitted("ping");
        state.apply(Action::Fail("connection refused".to_string())).unwrap();
        assert_eq!(state.last_message(), Some(&Message::assistant(FAILED_REPLY)));
        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.last_error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_fail_keeps_partial_reply() {
        let mut state = submitted("ping");
        state.apply(Action::Token("po".to_string())).unwrap();
        state.apply(Action::Fail("reset".to_string())).unwrap();
        assert_eq!(state.messages[2], Message::assistant("po"));
        assert_eq!(state.messages[3], Message::assistant(FAILED_REPLY));
        assert!(!state.is_busy());
    }

    #[test]
    fn test_next_submit_clears_last_error() {
        let mut state = submitted("ping");
        state.apply(Action::Fail("reset".to_string())).unwrap();
        state.apply(Action::SetInput("again".to_string())).unwrap();
        state.apply(Action::Submit).unwrap();
        assert_eq!(state.last_error, None);
    }

    #[test]
    fn test_append_input_joins_with_single_space() {
        let mut state = ChatState::default();
        state.apply(Action::AppendInput("what is".to_string())).unwrap();
        assert_eq!(state.input, "what is");
        state.apply(Action::AppendInput("  the time ".to_string())).unwrap();
        assert_eq!(state.input, "what is the time");
        state.apply(Action::AppendInput("   ".to_string())).unwrap();
        assert_eq!(state.input, "what is the time");
    }

    #[test]
    fn test_toggles() {
        let mut state = ChatState::new(None, false);
        state.apply(Action::ToggleVoiceOutput).unwrap();
        assert!(state.voice_output);
        state.apply(Action::SetListening(true)).unwrap();
        assert!(state.listening);
    }
}
