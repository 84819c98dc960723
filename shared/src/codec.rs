//! Turns raw text frames into [`ServerMessage`]s.
//!
//! Some servers wrap their payloads (the warp echo server prefixes every
//! broadcast with `[Client <id>]: `). That knowledge lives in a
//! [`FrameDialect`] so supporting another server never touches dispatch.

use crate::error::DecodeError;
use crate::protocol::ServerMessage;

/// Strips server-specific framing from a text frame.
pub trait FrameDialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn strip<'a>(&self, text: &'a str) -> &'a str;
}

/// Frames are exactly the JSON payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainDialect;

impl FrameDialect for PlainDialect {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn strip<'a>(&self, text: &'a str) -> &'a str {
        text
    }
}

/// Frames may carry an `<anything>]: ` prefix; everything up to and
/// including the first marker is dropped. A marker is only honoured before
/// the first `{`, so JSON whose strings contain `]: ` passes through intact.
/// A prefix that itself contains `{` is not recognised.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoPrefixDialect;

impl EchoPrefixDialect {
    pub const MARKER: &'static str = "]: ";
}

impl FrameDialect for EchoPrefixDialect {
    fn name(&self) -> &'static str {
        "echo-prefix"
    }

    fn strip<'a>(&self, text: &'a str) -> &'a str {
        match text.find(Self::MARKER) {
            Some(index) if !text[..index].contains('{') => &text[index + Self::MARKER.len()..],
            _ => text,
        }
    }
}

/// Result of classifying one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Message(ServerMessage),
    /// Connection banners, echoes and other non-JSON chatter.
    Text(String),
}

pub struct FrameDecoder {
    dialect: Box<dyn FrameDialect>,
}

impl FrameDecoder {
    pub fn new(dialect: Box<dyn FrameDialect>) -> Self {
        Self { dialect }
    }

    pub fn dialect_name(&self) -> &'static str {
        self.dialect.name()
    }

    pub fn decode(&self, text: &str) -> Result<Frame, DecodeError> {
        let payload = self.dialect.strip(text);

        if payload.trim_start().starts_with('{') {
            ServerMessage::from_json(payload).map(Frame::Message)
        } else {
            Ok(Frame::Text(payload.to_string()))
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(Box::new(EchoPrefixDialect))
    }
}
