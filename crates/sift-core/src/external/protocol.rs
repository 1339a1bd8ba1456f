//! Line-delimited JSON framing for out-of-process plugins.
//!
//! Every frame is a JSON array `[action, payload?]` followed by a newline,
//! in both directions:
//!
//! ```text
//! host    -> plugin   ["search","fire"]
//! plugin  -> host     ["result",[{"name":"firefox"}]]
//! plugin  -> host     ["settings",{"hint":"type an app"}]
//! ```

use bytes::{BufMut, BytesMut};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Maximum accepted line length (16 MB)
const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// One `[action, payload]` exchange unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub action: Option<String>,
    pub payload: Option<Value>,
}

impl Request {
    pub fn new(action: impl Into<String>, payload: impl Into<Option<Value>>) -> Self {
        Self {
            action: Some(action.into()),
            payload: payload.into(),
        }
    }

    /// Request without a payload, e.g. `["clear"]`
    pub fn bare(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            payload: None,
        }
    }

    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Serialize as a single line without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = match (&self.action, &self.payload) {
            (None, None) => 0,
            (_, None) => 1,
            (_, Some(_)) => 2,
        };
        let mut seq = serializer.serialize_seq(Some(len))?;
        if len > 0 {
            seq.serialize_element(&self.action)?;
        }
        if let Some(payload) = &self.payload {
            seq.serialize_element(payload)?;
        }
        seq.end()
    }
}

impl TryFrom<Value> for Request {
    type Error = ProtocolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Array(items) = value else {
            return Err(ProtocolError::NotATuple);
        };

        let mut items = items.into_iter();
        let action = match items.next() {
            None => None,
            Some(Value::String(action)) => Some(action),
            Some(_) => return Err(ProtocolError::ActionNotString),
        };

        Ok(Self {
            action,
            payload: items.next(),
        })
    }
}

/// Parse one frame from its JSON text.
///
/// # Errors
///
/// Returns an error if the text is not JSON, not an array, or the first
/// element is present but not a string.
pub fn parse_request(text: &str) -> Result<Request, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    Request::try_from(value)
}

/// Faults in frames or payloads received from a plugin process
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid request: not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid request: not a tuple")]
    NotATuple,

    #[error("invalid request: action is not a string")]
    ActionNotString,

    #[error("invalid {action} call: {reason}")]
    InvalidPayload {
        action: &'static str,
        reason: &'static str,
    },

    #[error("invalid settings: not an object")]
    InvalidSettings,

    #[error("invalid focus call: payload \"{0}\" is not a valid FocusTarget")]
    InvalidFocus(String),

    #[error("unknown request action '{0}'")]
    UnknownAction(String),
}

impl ProtocolError {
    pub(crate) fn payload(action: &'static str, reason: &'static str) -> Self {
        Self::InvalidPayload { action, reason }
    }
}

/// Result of decoding one line. A malformed line is reported without
/// ending the stream.
pub type Frame = Result<Request, ProtocolError>;

/// Codec for newline-delimited request frames
#[derive(Debug, Default)]
pub struct RequestCodec {
    // Bytes already scanned for a newline
    next_index: usize,
}

impl RequestCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_line(line: &[u8]) -> Option<Frame> {
        let Ok(text) = std::str::from_utf8(line) else {
            return Some(Err(ProtocolError::InvalidUtf8));
        };
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(parse_request(text))
    }
}

impl Decoder for RequestCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                if src.len() > MAX_LINE_LENGTH {
                    return Err(CodecError::LineTooLong(src.len()));
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if let Some(frame) = Self::parse_line(&line[..line.len() - 1]) {
                return Ok(Some(frame));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        // Final line without a trailing newline
        let line = src.split_to(src.len());
        self.next_index = 0;
        Ok(Self::parse_line(&line))
    }
}

impl Encoder<Request> for RequestCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item)?;
        if json.len() > MAX_LINE_LENGTH {
            return Err(CodecError::LineTooLong(json.len()));
        }

        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}

/// Errors that end a framed stream
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Line too long: {0} bytes (max: {MAX_LINE_LENGTH})")]
    LineTooLong(usize),
}
