//! Streaming RFC 5424 syslog parser.
//!
//! [`SyslogParser`] is a resumable, byte-driven state machine: it is fed
//! arbitrarily sized slices via [`SyslogParser::feed`] and emits events to a
//! [`MessageSink`] as it recognizes each piece of a frame. It never owns or
//! reads from a socket itself — that's [`crate::connection::Connection`]'s
//! job — which keeps the state machine synchronous, allocation-light on the
//! hot path, and trivially unit-testable with plain byte slices.
//!
//! The state transition table is the authority on behavior; see
//! [`ParserState`] for the lexical positions it walks through.

use thiserror::Error;

use crate::cursor::{ByteAccumulator, MAX_TOKEN_LEN};
use crate::record::MessageHead;
use crate::sink::{MessageSink, SinkError};

#[cfg(test)]
mod tests;

/// Errors produced while parsing a frame. All variants halt the current
/// frame; the connection layer is responsible for closing the peer.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("octet count contains a non-digit byte before the separating space")]
    MalformedOctetCount,

    #[error("octet count digit run exceeds 9 digits")]
    OctetCountOverflow,

    #[error("priority {0} is out of range 0..=191")]
    InvalidPriority(u16),

    #[error("version {0} is out of range 1..=999")]
    InvalidVersion(u32),

    #[error("field '{0}' exceeds its maximum length")]
    FieldTooLong(&'static str),

    #[error("structured data is malformed")]
    MalformedStructuredData,

    #[error("structured data param value was not quote-terminated within the frame")]
    UnterminatedSDValue,

    #[error("internal scratch buffer exceeded {MAX_TOKEN_LEN} bytes")]
    InternalBufferOverflow,

    #[error("message sink rejected an event: {0}")]
    Handler(#[from] SinkError),
}

/// Lexical position of the parser within the frame currently being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    ExpectingOctetCount,
    InOctetCount,
    ExpectingPriority,
    InPriority,
    ExpectingVersion,
    InVersion,
    ExpectingTimestamp,
    InTimestamp,
    ExpectingHostname,
    InHostname,
    ExpectingAppname,
    InAppname,
    ExpectingProcessId,
    InProcessId,
    ExpectingMessageId,
    InMessageId,
    ExpectingSDOrBody,
    InSDElementName,
    InSDParamName,
    ExpectingSDParamValue,
    InSDParamValue,
    InBody,
    MessageComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Timestamp,
    Hostname,
    Appname,
    ProcessId,
    MessageId,
}

impl FieldKind {
    fn max_len(self) -> usize {
        match self {
            FieldKind::Timestamp => 32,
            FieldKind::Hostname => 255,
            FieldKind::Appname => 48,
            FieldKind::ProcessId => 128,
            FieldKind::MessageId => 32,
        }
    }

    fn name(self) -> &'static str {
        match self {
            FieldKind::Timestamp => "timestamp",
            FieldKind::Hostname => "hostname",
            FieldKind::Appname => "appname",
            FieldKind::ProcessId => "processid",
            FieldKind::MessageId => "messageid",
        }
    }

    fn in_state(self) -> ParserState {
        match self {
            FieldKind::Timestamp => ParserState::InTimestamp,
            FieldKind::Hostname => ParserState::InHostname,
            FieldKind::Appname => ParserState::InAppname,
            FieldKind::ProcessId => ParserState::InProcessId,
            FieldKind::MessageId => ParserState::InMessageId,
        }
    }

    fn next_state(self) -> ParserState {
        match self {
            FieldKind::Timestamp => ParserState::ExpectingHostname,
            FieldKind::Hostname => ParserState::ExpectingAppname,
            FieldKind::Appname => ParserState::ExpectingProcessId,
            FieldKind::ProcessId => ParserState::ExpectingMessageId,
            FieldKind::MessageId => ParserState::ExpectingSDOrBody,
        }
    }
}

/// A streaming, resumable RFC 5424 parser bound to one TCP connection.
///
/// Create one per connection, `feed` it bytes as they arrive, and `reset`
/// it (or drop it) when the connection closes. A single instance parses an
/// unbounded number of back-to-back frames; state does not leak between
/// frames.
#[derive(Debug)]
pub struct SyslogParser {
    state: ParserState,
    message_length: u32,
    octets_remaining: u32,
    octet_value: u64,
    octet_digits: u8,
    priority_value: u32,
    priority_digits: u8,
    version_value: u32,
    acc: ByteAccumulator,
    head: MessageHead,
    sd_escape: bool,
    sd_awaiting_separator: bool,
}

impl Default for SyslogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SyslogParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::ExpectingOctetCount,
            message_length: 0,
            octets_remaining: 0,
            octet_value: 0,
            octet_digits: 0,
            priority_value: 0,
            priority_digits: 0,
            version_value: 0,
            acc: ByteAccumulator::new(),
            head: MessageHead::new(),
            sd_escape: false,
            sd_awaiting_separator: false,
        }
    }

    /// Returns the parser to its initial state, discarding any in-progress
    /// frame. Callers must invoke this after a `feed` error before reusing
    /// the parser — the parser does not attempt re-synchronization itself.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Feeds `bytes` to the parser, driving `sink` as frames are
    /// recognized. Accepts any chunk size, including splits mid-field, and
    /// processes any number of complete frames found within `bytes` (for
    /// back-to-back messages on the same connection).
    pub fn feed(&mut self, bytes: &[u8], sink: &mut impl MessageSink) -> Result<(), ParseError> {
        let mut i = 0;
        loop {
            match self.state {
                ParserState::ExpectingOctetCount | ParserState::InOctetCount => {
                    if i >= bytes.len() {
                        break;
                    }
                    let consumed = self.step_octet_count(&bytes[i..])?;
                    if consumed == 0 {
                        break;
                    }
                    i += consumed;
                }
                ParserState::MessageComplete => unreachable!("MessageComplete never persists across a step"),
                _ => {
                    if self.octets_remaining == 0 {
                        self.complete_or_error(sink)?;
                        continue;
                    }
                    if i >= bytes.len() {
                        break;
                    }
                    let avail = bytes.len() - i;
                    let window = avail.min(self.octets_remaining as usize);
                    if window == 0 {
                        break;
                    }
                    let consumed = self.step_payload(&bytes[i..i + window], sink)?;
                    if consumed == 0 {
                        break;
                    }
                    i += consumed;
                    self.octets_remaining -= consumed as u32;
                }
            }
        }
        Ok(())
    }

    fn complete_or_error(&mut self, sink: &mut impl MessageSink) -> Result<(), ParseError> {
        match self.state {
            ParserState::InSDElementName
            | ParserState::InSDParamName
            | ParserState::ExpectingSDParamValue
            | ParserState::InSDParamValue => Err(ParseError::UnterminatedSDValue),
            _ => {
                self.state = ParserState::MessageComplete;
                sink.on_msg_complete(self.message_length)?;
                self.start_new_frame();
                Ok(())
            }
        }
    }

    fn start_new_frame(&mut self) {
        self.state = ParserState::ExpectingOctetCount;
        self.message_length = 0;
        self.octets_remaining = 0;
        self.octet_value = 0;
        self.octet_digits = 0;
        self.priority_value = 0;
        self.priority_digits = 0;
        self.version_value = 0;
        self.acc.clear();
        self.head.reset();
        self.sd_escape = false;
        self.sd_awaiting_separator = false;
    }

    fn step_payload(
        &mut self,
        data: &[u8],
        sink: &mut impl MessageSink,
    ) -> Result<usize, ParseError> {
        match self.state {
            ParserState::ExpectingPriority | ParserState::InPriority => self.step_priority(data),
            ParserState::ExpectingVersion | ParserState::InVersion => self.step_version(data),
            ParserState::ExpectingTimestamp | ParserState::InTimestamp => {
                self.step_field(data, FieldKind::Timestamp, sink)
            }
            ParserState::ExpectingHostname | ParserState::InHostname => {
                self.step_field(data, FieldKind::Hostname, sink)
            }
            ParserState::ExpectingAppname | ParserState::InAppname => {
                self.step_field(data, FieldKind::Appname, sink)
            }
            ParserState::ExpectingProcessId | ParserState::InProcessId => {
                self.step_field(data, FieldKind::ProcessId, sink)
            }
            ParserState::ExpectingMessageId | ParserState::InMessageId => {
                self.step_field(data, FieldKind::MessageId, sink)
            }
            ParserState::ExpectingSDOrBody => self.step_sd_or_body(data, sink),
            ParserState::InSDElementName => self.step_sd_element_name(data, sink),
            ParserState::InSDParamName => self.step_sd_param_name(data, sink),
            ParserState::ExpectingSDParamValue => self.step_sd_param_value_start(data),
            ParserState::InSDParamValue => self.step_sd_param_value(data, sink),
            ParserState::InBody => self.step_body(data, sink),
            ParserState::ExpectingOctetCount
            | ParserState::InOctetCount
            | ParserState::MessageComplete => unreachable!("handled by the outer loop"),
        }
    }

    fn step_octet_count(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut idx = 0;
        while idx < data.len() {
            let b = data[idx];
            if b.is_ascii_digit() {
                self.octet_digits += 1;
                if self.octet_digits > 9 {
                    return Err(ParseError::OctetCountOverflow);
                }
                self.octet_value = self.octet_value * 10 + u64::from(b - b'0');
                self.state = ParserState::InOctetCount;
                idx += 1;
            } else if b == b' ' {
                if self.octet_digits == 0 {
                    return Err(ParseError::MalformedOctetCount);
                }
                self.message_length = self.octet_value as u32;
                self.octets_remaining = self.message_length;
                self.state = ParserState::ExpectingPriority;
                idx += 1;
                return Ok(idx);
            } else {
                return Err(ParseError::MalformedOctetCount);
            }
        }
        Ok(idx)
    }

    fn step_priority(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut idx = 0;
        while idx < data.len() {
            let b = data[idx];
            if self.state == ParserState::ExpectingPriority {
                if b != b'<' {
                    return Err(ParseError::InvalidPriority(self.priority_value as u16));
                }
                self.state = ParserState::InPriority;
                idx += 1;
                continue;
            }
            if b.is_ascii_digit() {
                self.priority_digits += 1;
                if self.priority_digits > 3 {
                    return Err(ParseError::InvalidPriority(self.priority_value as u16));
                }
                self.priority_value = self.priority_value * 10 + u32::from(b - b'0');
                if self.priority_value > 191 {
                    return Err(ParseError::InvalidPriority(self.priority_value as u16));
                }
                idx += 1;
            } else if b == b'>' {
                if self.priority_digits == 0 {
                    return Err(ParseError::InvalidPriority(0));
                }
                self.head.priority = self.priority_value as u16;
                self.state = ParserState::ExpectingVersion;
                idx += 1;
                return Ok(idx);
            } else {
                return Err(ParseError::InvalidPriority(self.priority_value as u16));
            }
        }
        Ok(idx)
    }

    fn step_version(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut idx = 0;
        while idx < data.len() {
            let b = data[idx];
            if self.state == ParserState::ExpectingVersion {
                if !b.is_ascii_digit() {
                    return Err(ParseError::InvalidVersion(self.version_value));
                }
                self.state = ParserState::InVersion;
            }
            if b.is_ascii_digit() {
                self.version_value = self.version_value * 10 + u32::from(b - b'0');
                if self.version_value > 999 {
                    return Err(ParseError::InvalidVersion(self.version_value));
                }
                idx += 1;
            } else if b == b' ' {
                if self.version_value == 0 {
                    return Err(ParseError::InvalidVersion(0));
                }
                self.head.version = self.version_value as u16;
                self.state = ParserState::ExpectingTimestamp;
                idx += 1;
                return Ok(idx);
            } else {
                return Err(ParseError::InvalidVersion(self.version_value));
            }
        }
        Ok(idx)
    }

    fn step_field(
        &mut self,
        data: &[u8],
        kind: FieldKind,
        sink: &mut impl MessageSink,
    ) -> Result<usize, ParseError> {
        self.state = kind.in_state();
        match data.iter().position(|&b| b == b' ') {
            Some(pos) => {
                if self.acc.len() + pos > kind.max_len() {
                    return Err(ParseError::FieldTooLong(kind.name()));
                }
                self.acc.push(&data[..pos])?;
                let token = self.acc.take();
                let value = String::from_utf8_lossy(&token).into_owned();
                match kind {
                    FieldKind::Timestamp => self.head.timestamp = value,
                    FieldKind::Hostname => self.head.hostname = value,
                    FieldKind::Appname => self.head.appname = value,
                    FieldKind::ProcessId => self.head.processid = value,
                    FieldKind::MessageId => {
                        self.head.messageid = value;
                        sink.on_msg_head(&self.head)?;
                    }
                }
                self.state = kind.next_state();
                Ok(pos + 1)
            }
            None => {
                if self.acc.len() + data.len() > kind.max_len() {
                    return Err(ParseError::FieldTooLong(kind.name()));
                }
                self.acc.push(data)?;
                Ok(data.len())
            }
        }
    }

    /// `-` followed by a space means a nil structured-data block (we only
    /// ever see this before any element has been opened); `[` opens another
    /// element, whether this is the first or a continuation after one just
    /// closed. Anything else once at least one element has closed means the
    /// structured-data block is done — that byte is the first byte of the
    /// body and is handed straight to [`Self::step_body`] rather than
    /// consumed as a separator, matching the octet-count accounting (spec
    /// open question: the leading body space is included in the body).
    fn step_sd_or_body(
        &mut self,
        data: &[u8],
        sink: &mut impl MessageSink,
    ) -> Result<usize, ParseError> {
        if data.is_empty() {
            return Ok(0);
        }
        match data[0] {
            b'-' if self.head.sd.is_empty() => {
                self.state = ParserState::InBody;
                Ok(1)
            }
            b'[' => {
                self.state = ParserState::InSDElementName;
                Ok(1)
            }
            _ if !self.head.sd.is_empty() => {
                self.state = ParserState::InBody;
                self.step_body(data, sink)
            }
            _ => Err(ParseError::MalformedStructuredData),
        }
    }

    fn step_sd_element_name(
        &mut self,
        data: &[u8],
        sink: &mut impl MessageSink,
    ) -> Result<usize, ParseError> {
        match data.iter().position(|&b| b == b' ' || b == b']') {
            Some(pos) => {
                if self.acc.len() + pos > MAX_TOKEN_LEN {
                    return Err(ParseError::InternalBufferOverflow);
                }
                self.acc.push(&data[..pos])?;
                let name = self.acc.take();
                self.head.create_sde(String::from_utf8_lossy(&name).into_owned());
                sink.on_sd_element(&name)?;
                self.state = if data[pos] == b']' {
                    ParserState::ExpectingSDOrBody
                } else {
                    ParserState::InSDParamName
                };
                Ok(pos + 1)
            }
            None => {
                self.acc.push(data)?;
                Ok(data.len())
            }
        }
    }

    fn step_sd_param_name(
        &mut self,
        data: &[u8],
        sink: &mut impl MessageSink,
    ) -> Result<usize, ParseError> {
        if data.is_empty() {
            return Ok(0);
        }
        if self.sd_awaiting_separator {
            return match data[0] {
                b']' => {
                    self.sd_awaiting_separator = false;
                    self.state = ParserState::ExpectingSDOrBody;
                    Ok(1)
                }
                b' ' => {
                    self.sd_awaiting_separator = false;
                    Ok(1)
                }
                _ => Err(ParseError::MalformedStructuredData),
            };
        }
        match data.iter().position(|&b| b == b'=') {
            Some(pos) => {
                if self.acc.len() + pos > MAX_TOKEN_LEN {
                    return Err(ParseError::InternalBufferOverflow);
                }
                self.acc.push(&data[..pos])?;
                let name = self.acc.take();
                sink.on_sd_field(&name)?;
                self.state = ParserState::ExpectingSDParamValue;
                Ok(pos + 1)
            }
            None => {
                self.acc.push(data)?;
                Ok(data.len())
            }
        }
    }

    fn step_sd_param_value_start(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        if data.is_empty() {
            return Ok(0);
        }
        if data[0] != b'"' {
            return Err(ParseError::MalformedStructuredData);
        }
        self.state = ParserState::InSDParamValue;
        self.sd_escape = false;
        Ok(1)
    }

    fn step_sd_param_value(
        &mut self,
        data: &[u8],
        sink: &mut impl MessageSink,
    ) -> Result<usize, ParseError> {
        let mut idx = 0;
        while idx < data.len() {
            let b = data[idx];
            if self.sd_escape {
                match b {
                    b'"' | b'\\' | b']' => self.acc.push(&[b])?,
                    other => self.acc.push(&[b'\\', other])?,
                }
                self.sd_escape = false;
                idx += 1;
                continue;
            }
            match b {
                b'\\' => {
                    self.sd_escape = true;
                    idx += 1;
                }
                b'"' => {
                    let value = self.acc.take();
                    sink.on_sd_value(&value)?;
                    self.sd_awaiting_separator = true;
                    self.state = ParserState::InSDParamName;
                    idx += 1;
                    return Ok(idx);
                }
                _ => {
                    self.acc.push(&[b])?;
                    idx += 1;
                }
            }
        }
        Ok(idx)
    }

    fn step_body(&mut self, data: &[u8], sink: &mut impl MessageSink) -> Result<usize, ParseError> {
        if data.is_empty() {
            return Ok(0);
        }
        sink.on_msg_part(data)?;
        Ok(data.len())
    }
}
