//! Accept loop: binds the configured `syslog_bind_host`, optionally wraps
//! each accepted socket in TLS, and spawns a [`Connection`] task per peer.
//!
//! Grounded on the teacher's `handle_forever`/`process_socket` accept loop
//! in `src/lib.rs`, generalized with optional TLS and `SO_REUSEPORT` so
//! multiple gateway processes can share one bind address (`[core]
//! processes` in configuration), as described for horizontal scaling.

use std::net::SocketAddr;
use std::sync::Arc;

use socket2::{Domain, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info, warn};

use crate::connection::{Connection, Stream};
use crate::transport::PushTransport;

/// Binds `addr` with `SO_REUSEPORT` set, so that multiple `Listener`
/// instances (one per worker process) can all accept connections for the
/// same address.
fn bind_reuseport(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    TcpListener::from_std(socket.into())
}

/// Accepts syslog connections on a single bound address and hands each one
/// off to its own [`Connection`] task.
pub struct Listener {
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    transport: Arc<PushTransport>,
}

impl Listener {
    pub fn bind(
        addr: SocketAddr,
        tls: Option<TlsAcceptor>,
        transport: Arc<PushTransport>,
    ) -> std::io::Result<Self> {
        let listener = bind_reuseport(addr)?;
        info!(%addr, tls = tls.is_some(), "listening for syslog connections");
        Ok(Self { listener, tls, transport })
    }

    /// Runs the accept loop until `shutdown` resolves, spawning connection
    /// tasks into `tasks` so the caller can track and await them.
    pub async fn run(self, tasks: &mut JoinSet<()>, shutdown: &tokio::sync::Notify) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((socket, peer)) => self.spawn_connection(socket, peer, tasks).await,
                        Err(e) => warn!(error = %e, "accept failed"),
                    }
                }
                _ = shutdown.notified() => {
                    info!("listener shutting down");
                    return;
                }
            }
        }
    }

    async fn spawn_connection(&self, socket: TcpStream, peer: SocketAddr, tasks: &mut JoinSet<()>) {
        if let Err(e) = socket.set_nodelay(true) {
            warn!(%peer, error = %e, "failed to set TCP_NODELAY");
        }

        let transport = Arc::clone(&self.transport);
        match &self.tls {
            Some(acceptor) => {
                let acceptor = acceptor.clone();
                tasks.spawn(async move {
                    match acceptor.accept(socket).await {
                        Ok(tls_stream) => {
                            let conn = Connection::new(
                                Stream::Tls(Box::new(tls_stream)),
                                peer.to_string(),
                                transport,
                            );
                            conn.run().await;
                        }
                        Err(e) => error!(%peer, error = %e, "TLS handshake failed"),
                    }
                });
            }
            None => {
                let conn = Connection::new(Stream::Plain(socket), peer.to_string(), transport);
                tasks.spawn(conn.run());
            }
        }
    }
}
