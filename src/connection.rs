//! Per-connection read loop: owns the socket, drives the parser, and
//! forwards completed records onto the shared transport.
//!
//! Grounded on the teacher's `read_task`/`process_socket` split (accept,
//! split the stream, spawn one task per connection) but collapsed into a
//! single task per connection: Portal's connections are read-only from the
//! gateway's perspective (syslog senders never expect replies), so there
//! is no write-half task to spawn alongside it.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;
use tracing::{debug, trace, warn};

use crate::assembler::MessageAssembler;
use crate::parser::SyslogParser;
use crate::transport::PushTransport;

/// Size of the read buffer used for each `read` syscall on a connection.
const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Either half of an optionally-TLS-wrapped accepted connection.
pub enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Stream {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf).await,
            Stream::Tls(s) => s.read(buf).await,
        }
    }
}

/// Owns one accepted connection for its entire lifetime: reads bytes,
/// feeds the streaming parser, and lets the [`MessageAssembler`] push
/// completed records onto the transport.
pub struct Connection {
    stream: Stream,
    peer: String,
    parser: SyslogParser,
    assembler: MessageAssembler,
}

impl Connection {
    pub fn new(stream: Stream, peer: String, transport: Arc<PushTransport>) -> Self {
        Self {
            stream,
            peer: peer.clone(),
            parser: SyslogParser::new(),
            assembler: MessageAssembler::new(transport, peer),
        }
    }

    /// Reads and parses until the peer closes the connection or a
    /// malformed frame is encountered. Never panics on peer input; every
    /// parse or I/O error ends the loop gracefully.
    pub async fn run(mut self) {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = match self.stream.read(&mut buf).await {
                Ok(0) => {
                    debug!(peer = %self.peer, "connection closed by peer");
                    return;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!(peer = %self.peer, error = %e, "read error, closing connection");
                    return;
                }
            };

            trace!(peer = %self.peer, bytes = n, "read chunk");
            if let Err(e) = self.parser.feed(&buf[..n], &mut self.assembler) {
                warn!(peer = %self.peer, error = %e, "malformed frame, closing connection");
                return;
            }
        }
    }
}
