//! Line-oriented terminal rendering of chat snapshots.
//!
//! Snapshots may be coalesced by the channel, so the renderer diffs each one
//! against what it has already written and only prints the new suffix.

use std::io::{self, Write};

use crate::state::{ChatState, Sender};

pub struct TranscriptRenderer<W: Write> {
    out: W,
    echo_user: bool,
    /// Bytes already written for each message
    written: Vec<usize>,
    line_open: bool,
    listening: bool,
}

impl<W: Write> TranscriptRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            echo_user: false,
            written: Vec::new(),
            line_open: false,
            listening: false,
        }
    }

    /// Also print user messages. Off by default since the terminal already
    /// shows what was typed.
    pub fn echo_user(mut self, echo: bool) -> Self {
        self.echo_user = echo;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn render(&mut self, state: &ChatState) -> io::Result<()> {
        if state.listening && !self.listening {
            self.close_line()?;
            writeln!(self.out, "[listening...]")?;
        }
        self.listening = state.listening;

        for (index, message) in state.messages.iter().enumerate() {
            if index >= self.written.len() {
                self.close_line()?;
                self.written.push(0);
                if message.sender == Sender::User && !self.echo_user {
                    self.written[index] = message.text.len();
                    continue;
                }
                write!(self.out, "{}", prefix(message.sender))?;
                self.line_open = true;
            }

            let already = self.written[index];
            if message.text.len() > already {
                if let Some(suffix) = message.text.get(already..) {
                    write!(self.out, "{suffix}")?;
                }
                self.written[index] = message.text.len();
            }
        }

        if !state.is_busy() {
            self.close_line()?;
        }
        self.out.flush()
    }

    fn close_line(&mut self) -> io::Result<()> {
        if self.line_open {
            writeln!(self.out)?;
            self.line_open = false;
        }
        Ok(())
    }
}

fn prefix(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "you> ",
        Sender::Assistant => "companion> ",
    }
}
