//! The structured representation a completed syslog frame is normalized
//! into, plus its JSON rendering.

use std::collections::BTreeMap;

use serde::Serialize;

/// The nil token RFC 5424 uses for an absent header field.
pub const NIL: &str = "-";

/// The parsed RFC 5424 header, minus the body.
///
/// SD element and parameter insertion order is not meaningful per the
/// wire format, so a [`BTreeMap`] is used rather than preserving insertion
/// order: it gives deterministic, reproducible serialization without
/// claiming an ordering guarantee the format doesn't have.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHead {
    pub priority: u16,
    pub version: u16,
    pub timestamp: String,
    pub hostname: String,
    pub appname: String,
    pub processid: String,
    pub messageid: String,
    pub sd: BTreeMap<String, BTreeMap<String, String>>,
}

impl MessageHead {
    pub fn new() -> Self {
        Self {
            priority: 0,
            version: 0,
            timestamp: NIL.to_string(),
            hostname: NIL.to_string(),
            appname: NIL.to_string(),
            processid: NIL.to_string(),
            messageid: NIL.to_string(),
            sd: BTreeMap::new(),
        }
    }

    /// Starts a new structured-data element, becoming the target of
    /// subsequent [`Self::set_sd_field`]/[`Self::set_sd_value`] calls.
    pub fn create_sde(&mut self, sdid: String) {
        self.sd.entry(sdid).or_default();
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// A fully assembled syslog message: header plus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub head: MessageHead,
    pub body: Vec<u8>,
    pub body_length: u32,
}

impl MessageRecord {
    /// Renders the record as the JSON object sent downstream.
    ///
    /// Field order is fixed (not alphabetical) so that byte-for-byte
    /// identical inputs produce byte-for-byte identical output, matching
    /// the stability contract in the spec without claiming any ordering
    /// significance to consumers.
    pub fn to_json(&self) -> serde_json::Value {
        let message = String::from_utf8_lossy(&self.body).into_owned();

        let sd: serde_json::Map<String, serde_json::Value> = self
            .head
            .sd
            .iter()
            .map(|(sdid, fields)| {
                let fields: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect();
                (sdid.clone(), serde_json::Value::Object(fields))
            })
            .collect();

        serde_json::json!({
            "priority": self.head.priority,
            "version": self.head.version,
            "timestamp": self.head.timestamp,
            "hostname": self.head.hostname,
            "appname": self.head.appname,
            "processid": self.head.processid,
            "messageid": self.head.messageid,
            "sd": sd,
            "message": message,
            "msg_length": self.body_length,
        })
    }
}

/// Serde-friendly mirror of [`MessageRecord::to_json`]'s shape, used by
/// tests to deserialize and assert on a record round trip.
#[derive(Debug, Serialize, PartialEq, Eq, serde::Deserialize)]
pub struct WireRecord {
    pub priority: u16,
    pub version: u16,
    pub timestamp: String,
    pub hostname: String,
    pub appname: String,
    pub processid: String,
    pub messageid: String,
    pub sd: BTreeMap<String, BTreeMap<String, String>>,
    pub message: String,
    pub msg_length: u32,
}
