//! The capability set [`SyslogParser`](crate::parser::SyslogParser) calls
//! out to as it recognizes each piece of a frame.
//!
//! A narrow trait in place of a duck-typed callback object, so the parser
//! can be driven with zero-cost static dispatch by whichever type wires
//! the events into a [`MessageRecord`](crate::record::MessageRecord), with
//! no FFI boundary to marshal callbacks across.

use thiserror::Error;

use crate::record::MessageHead;

/// Error returned by a [`MessageSink`] implementation. Surfaces as
/// [`crate::parser::ParseError::Handler`] and halts the current frame.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("message sink failed: {0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Event sink driven by [`crate::parser::SyslogParser::feed`].
///
/// Methods are called in a fixed order per frame: exactly one
/// `on_msg_head`, any number of `on_sd_element`/`on_sd_field`/`on_sd_value`
/// triples (element before its fields, field before its value), any number
/// of `on_msg_part`, then exactly one `on_msg_complete`.
pub trait MessageSink {
    fn on_msg_head(&mut self, head: &MessageHead) -> Result<(), SinkError>;

    fn on_msg_part(&mut self, bytes: &[u8]) -> Result<(), SinkError>;

    fn on_msg_complete(&mut self, msg_length: u32) -> Result<(), SinkError>;

    fn on_sd_element(&mut self, name: &[u8]) -> Result<(), SinkError>;

    fn on_sd_field(&mut self, name: &[u8]) -> Result<(), SinkError>;

    fn on_sd_value(&mut self, value: &[u8]) -> Result<(), SinkError>;
}
