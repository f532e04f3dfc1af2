//! Streamed chat replies: decoding `data:`-framed token streams, the
//! [`ChatBackend`] seam used by the companion, and the upstream model client
//! used by the server.

mod client;
mod decoder;
mod error;
mod upstream;

pub use client::{ChatBackend, HttpChatBackend};
pub use decoder::{
    decode_reply, decode_reply_with_idle_timeout, parse_line, EventLineDecoder, ReplyStream,
    StreamEvent, Utf8Decoder, DONE_SENTINEL, EVENT_PREFIX, MAX_LINE_BYTES,
};
pub use error::StreamError;
pub use upstream::{
    UpstreamChatClient, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT,
};
