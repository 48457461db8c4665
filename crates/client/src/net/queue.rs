//! Payload queues between the socket tasks and everyone else.
//!
//! Both directions carry raw payloads (`VarInt(id) || fields`). An empty
//! payload is the in-band "connection is done" sentinel. The inbound side
//! may also carry the protocol error that killed the receive task.

use std::time::Duration;

use tokio::sync::mpsc;
use ultimate_protocol::ProtocolError;

use crate::error::{ClientError, Result};

/// What the receive task pushes: a payload, or the error it stopped on.
pub type InboundItem = std::result::Result<Vec<u8>, ProtocolError>;

pub type InboundSender = mpsc::UnboundedSender<InboundItem>;

/// Create a connected inbound pair: the receive task pushes, dispatch pops.
pub fn inbound() -> (InboundSender, Inbound) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Inbound { rx })
}

/// Create a connected outbound pair: anyone pushes, the send task pops.
pub fn outbound() -> (Outbound, mpsc::UnboundedReceiver<Vec<u8>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbound { tx }, rx)
}

/// Consumer end of the inbound queue.
pub struct Inbound {
    rx: mpsc::UnboundedReceiver<InboundItem>,
}

impl Inbound {
    /// Pop the next payload, waiting at most `wait`.
    ///
    /// The sentinel (or a dropped producer) becomes
    /// [`ClientError::ConnectionClosed`], a forwarded protocol error becomes
    /// [`ClientError::Protocol`], and an expired wait is a server timeout.
    pub async fn recv(&mut self, wait: Duration) -> Result<Vec<u8>> {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Err(_) => Err(ClientError::Timeout(wait)),
            Ok(None) => Err(ClientError::ConnectionClosed),
            Ok(Some(Err(e))) => Err(ClientError::Protocol(e)),
            Ok(Some(Ok(payload))) if payload.is_empty() => Err(ClientError::ConnectionClosed),
            Ok(Some(Ok(payload))) => Ok(payload),
        }
    }
}

/// Producer end of the outbound queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl Outbound {
    /// Queue a payload for sending. Returns `false` once the send task is gone.
    pub fn send(&self, payload: Vec<u8>) -> bool {
        debug_assert!(!payload.is_empty(), "empty payload is reserved for the sentinel");
        if self.tx.send(payload).is_err() {
            tracing::debug!("Dropping outbound payload: send loop has exited");
            return false;
        }
        true
    }

    /// Queue the sentinel: the send task exits after flushing what is ahead of it.
    pub fn close(&self) {
        let _ = self.tx.send(Vec::new());
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
