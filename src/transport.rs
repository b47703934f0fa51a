//! Fan-out delivery of assembled records to downstream consumers.
//!
//! The original implementation pushed JSON messages onto a ZeroMQ `PUSH`
//! socket, relying on ZMQ's built-in fair-queued round-robin distribution
//! across whichever workers had connected a `PULL` socket. No ZeroMQ
//! binding is available here, but the same push/round-robin contract falls
//! out of a bounded MPMC channel: every [`TransportConsumer`] calls
//! `recv()` on the same underlying queue, so messages are handed to
//! whichever consumer asks for one next, with no message seen by more than
//! one consumer. `async_channel` already appeared, unused, in the
//! teacher's own dependency list, so reaching for it here keeps the
//! dependency stack aligned with the teacher rather than widening it.

use thiserror::Error;

use crate::record::MessageRecord;

/// Errors surfaced by [`PushTransport`].
#[derive(Debug, Error, PartialEq)]
pub enum TransportError {
    /// A record could not be queued because every consumer slot is full
    /// and the transport does not block the connection task to wait.
    #[error("transport is at capacity, dropping message")]
    Full,

    /// A record could not be queued because no consumer is connected and
    /// the channel has been closed.
    #[error("transport has no connected consumers")]
    NotBound,
}

/// The shared fan-out channel. One instance is created per running
/// [`crate::pipeline::Pipeline`] and handed to every accepted connection
/// as an `Arc<PushTransport>`.
#[derive(Debug)]
pub struct PushTransport {
    sender: async_channel::Sender<MessageRecord>,
    receiver: async_channel::Receiver<MessageRecord>,
}

impl PushTransport {
    /// Creates a transport with a bounded queue. `capacity` is the number
    /// of assembled-but-undelivered records the gateway will buffer before
    /// connection tasks start seeing [`TransportError::Full`].
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = async_channel::bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Registers a new downstream consumer. Any number of consumers may be
    /// subscribed; each record is delivered to exactly one of them.
    pub fn subscribe(&self) -> TransportConsumer {
        TransportConsumer {
            receiver: self.receiver.clone(),
        }
    }

    /// Enqueues a record without blocking. Used on the connection read
    /// loop, which must never stall waiting for a downstream consumer.
    pub fn try_send(&self, record: MessageRecord) -> Result<(), TransportError> {
        match self.sender.try_send(record) {
            Ok(()) => Ok(()),
            Err(async_channel::TrySendError::Full(_)) => Err(TransportError::Full),
            Err(async_channel::TrySendError::Closed(_)) => Err(TransportError::NotBound),
        }
    }

    /// Number of consumers currently subscribed.
    pub fn consumer_count(&self) -> usize {
        self.receiver.receiver_count()
    }

    /// Closes the transport. Idempotent: closing an already-closed
    /// transport is a no-op. Every subscribed consumer drains whatever is
    /// already queued, then sees its `recv` resolve to `None`; any
    /// `try_send` after this point returns [`TransportError::NotBound`].
    pub fn close(&self) {
        self.sender.close();
    }
}

/// A downstream consumer's handle onto the shared transport. Calling
/// `recv` repeatedly drains a fair round-robin share of the records pushed
/// by every connection on the gateway.
#[derive(Debug, Clone)]
pub struct TransportConsumer {
    receiver: async_channel::Receiver<MessageRecord>,
}

impl TransportConsumer {
    pub async fn recv(&self) -> Option<MessageRecord> {
        self.receiver.recv().await.ok()
    }

    #[cfg(test)]
    pub fn try_recv(&self) -> Option<MessageRecord> {
        self.receiver.try_recv().ok()
    }
}
