//! Portal is an RFC 5424 syslog ingest gateway: it accepts octet-counted
//! syslog frames over TCP (optionally TLS), parses them with a streaming
//! state machine, normalizes each into a JSON-serializable record, and
//! fans completed records out to downstream consumers with round-robin
//! delivery.
//!
//! Module map:
//! - [`parser`] — the streaming RFC 5424 state machine
//! - [`sink`] — the event trait the parser drives
//! - [`record`] — the normalized message shape and its JSON rendering
//! - [`assembler`] — turns parser events into [`record::MessageRecord`]s
//! - [`transport`] — the fan-out channel assembled records are pushed onto
//! - [`connection`] / [`listener`] / [`pipeline`] — the network plumbing
//! - [`config`] / [`tls`] / [`logging`] — the ambient stack

pub mod assembler;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod listener;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod sink;
pub mod tls;
pub mod transport;

use thiserror::Error;

/// Top-level error type for binary entry points; every subsystem error
/// converts into this via `?`, and `src/bin/portal.rs` maps each variant
/// onto a process exit code.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for failures that don't belong to a specific subsystem,
    /// e.g. a failed async runtime start.
    #[error("runtime error: {0}")]
    Runtime(String),
}
