//! Wires together the listener and transport, and gives callers a single
//! `start`/`stop` lifecycle instead of managing tasks individually.
//!
//! The stop flag plus [`tokio::sync::Notify`] pairing guards against the
//! double-stop / stop-before-start races that the teacher's task modules
//! don't have to think about (they run for the life of the process), but
//! which matter here since a gateway may be stopped and restarted within a
//! single test process.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tracing::info;

use crate::listener::Listener;
use crate::transport::{PushTransport, TransportConsumer};

/// A running (or not-yet-started) syslog ingest gateway: one listener plus
/// the shared fan-out transport its connections push onto.
pub struct Pipeline {
    addr: SocketAddr,
    tls: Option<TlsAcceptor>,
    transport: Arc<PushTransport>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    accept_task: Option<JoinSet<()>>,
    connection_tasks: Arc<tokio::sync::Mutex<JoinSet<()>>>,
}

impl Pipeline {
    pub fn new(addr: SocketAddr, tls: Option<TlsAcceptor>, transport_capacity: usize) -> Self {
        Self {
            addr,
            tls,
            transport: Arc::new(PushTransport::new(transport_capacity)),
            shutdown: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
            accept_task: None,
            connection_tasks: Arc::new(tokio::sync::Mutex::new(JoinSet::new())),
        }
    }

    /// Registers a downstream consumer of assembled records. Must be
    /// called before [`Self::start`] if the caller wants to observe
    /// records from the moment the listener comes up.
    pub fn subscribe(&self) -> TransportConsumer {
        self.transport.subscribe()
    }

    /// Starts accepting connections. Idempotent: calling `start` on an
    /// already-running pipeline is a no-op.
    pub async fn start(&mut self) -> std::io::Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let listener = Listener::bind(self.addr, self.tls.clone(), Arc::clone(&self.transport))?;
        let shutdown = Arc::clone(&self.shutdown);
        let connection_tasks = Arc::clone(&self.connection_tasks);

        let mut accept_task = JoinSet::new();
        accept_task.spawn(async move {
            let mut conn_tasks = connection_tasks.lock().await;
            listener.run(&mut conn_tasks, &shutdown).await;
        });

        self.accept_task = Some(accept_task);
        info!("pipeline started");
        Ok(())
    }

    /// Signals shutdown and waits for the accept loop and every in-flight
    /// connection task it spawned to finish. Idempotent: calling `stop` on
    /// a pipeline that was never started, or already stopped, is a no-op.
    pub async fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.notify_waiters();
        if let Some(mut accept_task) = self.accept_task.take() {
            while accept_task.join_next().await.is_some() {}
        }
        let mut conn_tasks = self.connection_tasks.lock().await;
        while conn_tasks.join_next().await.is_some() {}
        self.transport.close();
        info!("pipeline stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
