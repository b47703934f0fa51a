//! Bridges the byte-level [`MessageSink`] callbacks into complete
//! [`MessageRecord`]s pushed onto a [`PushTransport`].
//!
//! One [`MessageAssembler`] is owned by each [`crate::connection::Connection`]
//! and driven directly by its [`crate::parser::SyslogParser`]; it holds the
//! in-progress head and body for exactly one frame at a time.

use std::sync::Arc;

use tracing::trace;

use crate::record::{MessageHead, MessageRecord};
use crate::sink::{MessageSink, SinkError};
use crate::transport::PushTransport;

/// Assembles parser events into [`MessageRecord`]s and forwards each
/// completed record to a shared [`PushTransport`].
#[derive(Debug)]
pub struct MessageAssembler {
    transport: Arc<PushTransport>,
    peer: String,
    head: Option<MessageHead>,
    body: Vec<u8>,
    current_sdid: Option<String>,
    current_field: Option<String>,
}

impl MessageAssembler {
    pub fn new(transport: Arc<PushTransport>, peer: String) -> Self {
        Self {
            transport,
            peer,
            head: None,
            body: Vec::new(),
            current_sdid: None,
            current_field: None,
        }
    }
}

impl MessageSink for MessageAssembler {
    fn on_msg_head(&mut self, head: &MessageHead) -> Result<(), SinkError> {
        self.head = Some(head.clone());
        self.body.clear();
        self.current_sdid = None;
        self.current_field = None;
        Ok(())
    }

    fn on_msg_part(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.body.extend_from_slice(bytes);
        Ok(())
    }

    fn on_msg_complete(&mut self, msg_length: u32) -> Result<(), SinkError> {
        let head = self
            .head
            .take()
            .ok_or_else(|| SinkError::new("on_msg_complete fired without a preceding on_msg_head"))?;
        let record = MessageRecord {
            head,
            body: std::mem::take(&mut self.body),
            body_length: msg_length,
        };
        trace!(peer = %self.peer, msg_length, "assembled record");
        self.transport
            .try_send(record)
            .map_err(|e| SinkError::new(format!("transport rejected assembled record: {e}")))
    }

    fn on_sd_element(&mut self, name: &[u8]) -> Result<(), SinkError> {
        let sdid = String::from_utf8_lossy(name).into_owned();
        let head = self
            .head
            .as_mut()
            .ok_or_else(|| SinkError::new("on_sd_element fired without a preceding on_msg_head"))?;
        head.create_sde(sdid.clone());
        self.current_sdid = Some(sdid);
        Ok(())
    }

    fn on_sd_field(&mut self, name: &[u8]) -> Result<(), SinkError> {
        self.current_field = Some(String::from_utf8_lossy(name).into_owned());
        Ok(())
    }

    fn on_sd_value(&mut self, value: &[u8]) -> Result<(), SinkError> {
        let sdid = self
            .current_sdid
            .clone()
            .ok_or_else(|| SinkError::new("on_sd_value fired without an open SD element"))?;
        let field = self
            .current_field
            .take()
            .ok_or_else(|| SinkError::new("on_sd_value fired without a preceding on_sd_field"))?;
        let head = self
            .head
            .as_mut()
            .ok_or_else(|| SinkError::new("on_sd_value fired without a preceding on_msg_head"))?;
        head.sd
            .entry(sdid)
            .or_default()
            .insert(field, String::from_utf8_lossy(value).into_owned());
        Ok(())
    }
}
