//! Incremental decoding of `data: {json}` event lines.
//!
//! Bytes arrive in arbitrary chunks: a chunk may end in the middle of a
//! multi-byte UTF-8 sequence or in the middle of a line. Both are carried
//! over to the next chunk, so the decoded events never depend on where the
//! transport happened to split the body.

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::error::StreamError;

/// Prefix that marks an event line.
pub const EVENT_PREFIX: &str = "data: ";
/// Payload sent by the producer after the last token.
pub const DONE_SENTINEL: &str = "[DONE]";
/// Longest line kept while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// One decoded item of a streamed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text fragment to append to the reply.
    Token(String),
    /// The producer sent the sentinel; nothing follows.
    Done,
}

pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, StreamError>> + Send>>;

/// UTF-8 decoder that keeps an incomplete trailing sequence between calls.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid_up_to]));
                    match e.error_len() {
                        // Invalid sequence in the middle of the input
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid_up_to + len..];
                        }
                        // Truncated sequence at the end: wait for more bytes
                        None => {
                            self.pending = rest[valid_up_to..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at end of input. A sequence that never completed becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

/// Splits decoded text into lines and turns event lines into [`StreamEvent`]s.
#[derive(Debug, Default)]
pub struct EventLineDecoder {
    utf8: Utf8Decoder,
    line: String,
    /// Set after an oversized line was dropped, until its newline arrives.
    discarding: bool,
}

impl EventLineDecoder {
    /// Feed one chunk and return the events of every line it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let text = self.utf8.decode(chunk);
        // Only the new text can hold a newline
        let mut scan_from = self.line.len();
        self.line.push_str(&text);

        let mut events = Vec::new();
        while let Some(offset) = self.line[scan_from..].find('\n') {
            let line: String = self.line.drain(..=scan_from + offset).collect();
            scan_from = 0;
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            events.extend(parse_line(&line));
        }

        if self.line.len() > MAX_LINE_BYTES {
            warn!(len = self.line.len(), "Dropping oversized event line");
            self.line.clear();
            self.discarding = true;
        }
        events
    }

    /// Treat whatever is still buffered as a final, unterminated line.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let tail = self.utf8.finish();
        self.line.push_str(&tail);
        let line = std::mem::take(&mut self.line);
        if std::mem::take(&mut self.discarding) {
            return Vec::new();
        }
        parse_line(&line).into_iter().collect()
    }
}

/// Parse a single line. Returns `None` for lines that carry nothing: foreign
/// lines, blank lines and payloads that fail to parse. The prefix must start
/// the line; only trailing whitespace is ignored.
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim_end();
    let payload = line.strip_prefix(EVENT_PREFIX)?;
    if payload == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(json) => {
            let token = json
                .pointer("/choices/0/delta/content")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Some(StreamEvent::Token(token.to_string()))
        }
        Err(e) => {
            warn!(error = %e, payload, "Skipping unparsable event line");
            None
        }
    }
}

/// Decode a byte stream into reply events.
///
/// The sentinel ends the reply: the byte stream is dropped as soon as it is
/// seen, even if the producer keeps the connection open. Empty tokens are
/// not forwarded.
pub fn decode_reply<S, E>(bytes: S) -> ReplyStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<StreamError> + Send + 'static,
{
    decode_reply_with_idle_timeout(bytes, None)
}

/// Like [`decode_reply`], but fails with [`StreamError::Timeout`] when no
/// chunk arrives within `idle_timeout`.
pub fn decode_reply_with_idle_timeout<S, E>(bytes: S, idle_timeout: Option<Duration>) -> ReplyStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<StreamError> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = EventLineDecoder::default();
        let mut chunks = 0usize;

        loop {
            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, bytes.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        yield Err(StreamError::Timeout(limit.as_secs()));
                        return;
                    }
                },
                None => bytes.next().await,
            };

            let (events, finished) = match next {
                Some(Ok(chunk)) => {
                    chunks += 1;
                    (decoder.feed(&chunk), false)
                }
                Some(Err(e)) => {
                    yield Err(e.into());
                    return;
                }
                None => (decoder.finish(), true),
            };

            for event in events {
                match event {
                    StreamEvent::Done => {
                        debug!(chunks, "Reply stream reached sentinel");
                        yield Ok(StreamEvent::Done);
                        return;
                    }
                    StreamEvent::Token(token) if token.is_empty() => {}
                    token => yield Ok(token),
                }
            }

            if finished {
                debug!(chunks, "Reply stream ended without sentinel");
                return;
            }
        }
    })
}
