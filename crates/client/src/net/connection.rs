//! Client-side transport: one TCP stream, one receive task, one send task.
//!
//! Unconnected -> Connected -> Closed
//!
//! The receive task turns frames into raw payloads on the inbound queue; the
//! send task frames whatever lands on the outbound queue. Both stop on the
//! empty-payload sentinel, on a socket error, or when [`Connection::close`]
//! (or `Drop`) flips the shutdown channel. A protocol violation on the read
//! side is forwarded to the inbound consumer ahead of the sentinel.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use ultimate_protocol::ProtocolError;
use ultimate_protocol::frame::CompressionThreshold;

use crate::error::{ClientError, Result};
use crate::net::queue::InboundSender;

pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unconnected,
    Connected,
    Closed,
}

/// Read lockstep: while enabled, the receive task waits for the consumer to
/// acknowledge every delivered frame before reading the next one.
#[derive(Debug, Clone, Copy, Default)]
struct ReadGate {
    lockstep: bool,
    acked: u64,
}

pub struct Connection {
    link: LinkState,
    peer: Option<SocketAddr>,
    reader: Option<OwnedReadHalf>,
    writer: Option<OwnedWriteHalf>,
    threshold: CompressionThreshold,
    shutdown: watch::Sender<bool>,
    gate: watch::Sender<ReadGate>,
    listener: Option<JoinHandle<()>>,
    sender: Option<JoinHandle<()>>,
    listener_alive: Arc<AtomicBool>,
    sender_alive: Arc<AtomicBool>,
    start_timeout: Duration,
    join_timeout: Duration,
}

impl Connection {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        let (gate, _) = watch::channel(ReadGate::default());
        Self {
            link: LinkState::Unconnected,
            peer: None,
            reader: None,
            writer: None,
            threshold: CompressionThreshold::default(),
            shutdown,
            gate,
            listener: None,
            sender: None,
            listener_alive: Arc::new(AtomicBool::new(false)),
            sender_alive: Arc::new(AtomicBool::new(false)),
            start_timeout: DEFAULT_START_TIMEOUT,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }

    /// How long `start_*` waits for the task to report in.
    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    /// How long `close` waits for each task before aborting it.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Open the TCP stream. Failures are reported, never retried.
    pub async fn connect(&mut self, addr: &str, timeout: Duration) -> Result<()> {
        if self.link != LinkState::Unconnected {
            return Err(ClientError::AlreadyRunning("connection"));
        }

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Err(_) => return Err(ClientError::ConnectTimeout(addr.to_string())),
            Ok(Err(source)) => {
                return Err(ClientError::Connect {
                    addr: addr.to_string(),
                    source,
                });
            }
            Ok(Ok(stream)) => stream,
        };
        stream.set_nodelay(true).map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;

        self.peer = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();
        self.reader = Some(reader);
        self.writer = Some(writer);
        self.link = LinkState::Connected;

        tracing::info!("Connected to {}", addr);
        Ok(())
    }

    /// Spawn the receive task, feeding decoded payloads into `inbound`.
    pub async fn start_listener(&mut self, inbound: InboundSender) -> Result<()> {
        if self.listener_alive.load(Ordering::Acquire) {
            return Err(ClientError::AlreadyRunning("listener"));
        }
        let Some(reader) = self.reader.take() else {
            return Err(ClientError::ConnectionClosed);
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        let alive = Arc::clone(&self.listener_alive);
        alive.store(true, Ordering::Release);

        let threshold = self.threshold.clone();
        let shutdown = self.shutdown.subscribe();
        let gate = self.gate.subscribe();
        let handle = tokio::spawn(async move {
            let _ = ready_tx.send(());
            receive_loop(reader, threshold, inbound, shutdown, gate).await;
            alive.store(false, Ordering::Release);
        });

        self.listener = Some(handle);
        self.await_ready(ready_rx, "listener").await
    }

    /// Spawn the send task, draining `outbound` onto the socket.
    pub async fn start_sender(&mut self, outbound: mpsc::UnboundedReceiver<Vec<u8>>) -> Result<()> {
        if self.sender_alive.load(Ordering::Acquire) {
            return Err(ClientError::AlreadyRunning("sender"));
        }
        let Some(writer) = self.writer.take() else {
            return Err(ClientError::ConnectionClosed);
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        let alive = Arc::clone(&self.sender_alive);
        alive.store(true, Ordering::Release);

        let threshold = self.threshold.clone();
        let shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            let _ = ready_tx.send(());
            send_loop(writer, threshold, outbound, shutdown).await;
            alive.store(false, Ordering::Release);
        });

        self.sender = Some(handle);
        self.await_ready(ready_rx, "sender").await
    }

    async fn await_ready(&self, ready: oneshot::Receiver<()>, role: &'static str) -> Result<()> {
        match tokio::time::timeout(self.start_timeout, ready).await {
            Ok(Ok(())) => {
                tracing::debug!("{} task started", role);
                Ok(())
            }
            _ => {
                tracing::error!("{} task failed to start within {:?}", role, self.start_timeout);
                Err(ClientError::StartFailed(role))
            }
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener_alive.load(Ordering::Acquire)
    }

    pub fn is_sending(&self) -> bool {
        self.sender_alive.load(Ordering::Acquire)
    }

    /// Shut everything down. Safe to call any number of times.
    pub async fn close(&mut self) {
        if self.link == LinkState::Closed {
            return;
        }
        self.link = LinkState::Closed;
        self.shutdown.send_replace(true);

        // Halves that never got a task are ours to release.
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        self.reader = None;

        let join_timeout = self.join_timeout;
        for (role, handle) in [("listener", self.listener.take()), ("sender", self.sender.take())] {
            let Some(mut handle) = handle else { continue };
            if tokio::time::timeout(join_timeout, &mut handle).await.is_err() {
                tracing::warn!("{} task did not exit within {:?}, aborting", role, join_timeout);
                handle.abort();
            }
        }

        match self.peer {
            Some(peer) => tracing::info!("Connection to {} closed", peer),
            None => tracing::debug!("Connection closed"),
        }
    }

    // ── Compression ─────────────────────────────────────────────────────

    /// Switch both directions to a new threshold. Negative disables compression.
    pub fn set_compression_threshold(&self, threshold: i32) {
        self.threshold.set(threshold);
        tracing::debug!("Compression threshold set to {}", threshold);
    }

    pub fn compression_threshold(&self) -> i32 {
        self.threshold.get()
    }

    // ── Read lockstep ───────────────────────────────────────────────────

    /// Enable or release read lockstep. Enable it before the first frame
    /// arrives; acknowledgements count every frame since the listener started.
    pub fn set_lockstep(&self, enabled: bool) {
        self.gate.send_modify(|g| g.lockstep = enabled);
    }

    /// Tell the receive task the last delivered frame has been dealt with.
    pub fn ack_frame(&self) {
        self.gate.send_modify(|g| g.acked += 1);
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
        for handle in [self.listener.take(), self.sender.take()].into_iter().flatten() {
            handle.abort();
        }
    }
}

// ── Tasks ───────────────────────────────────────────────────────────────

async fn receive_loop(
    mut reader: OwnedReadHalf,
    threshold: CompressionThreshold,
    inbound: InboundSender,
    mut shutdown: watch::Receiver<bool>,
    mut gate: watch::Receiver<ReadGate>,
) {
    let mut delivered: u64 = 0;
    loop {
        let codec = threshold.codec();
        let frame = tokio::select! {
            frame = codec.read_frame(&mut reader) => frame,
            _ = shutdown.wait_for(|stop| *stop) => break,
        };

        match frame {
            Ok(payload) if payload.is_empty() => {
                tracing::warn!("Receive loop ending: {}", ProtocolError::EmptyPacket);
                let _ = inbound.send(Err(ProtocolError::EmptyPacket));
                break;
            }
            Ok(payload) => {
                if inbound.send(Ok(payload)).is_err() {
                    break;
                }
                delivered += 1;
            }
            Err(ProtocolError::ConnectionBroken) => {
                tracing::debug!("Receive loop ending: peer closed the stream");
                break;
            }
            Err(e) => {
                tracing::warn!("Receive loop ending: {}", e);
                let _ = inbound.send(Err(e));
                break;
            }
        }

        if gate.borrow().lockstep {
            let released = tokio::select! {
                released = gate.wait_for(|g| !g.lockstep || g.acked >= delivered) => released.is_ok(),
                _ = shutdown.wait_for(|stop| *stop) => false,
            };
            if !released {
                break;
            }
        }
    }

    // Downstream learns about the dead connection from the sentinel.
    let _ = inbound.send(Ok(Vec::new()));
    tracing::debug!("Receive loop exited after {} frames", delivered);
}

async fn send_loop(
    mut writer: OwnedWriteHalf,
    threshold: CompressionThreshold,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut sent: u64 = 0;
    loop {
        // Queue first: whatever was queued ahead of the sentinel still goes out.
        let payload = tokio::select! {
            biased;
            payload = outbound.recv() => payload,
            _ = shutdown.wait_for(|stop| *stop) => break,
        };
        let Some(payload) = payload else { break };
        if payload.is_empty() {
            tracing::debug!("Send loop got sentinel");
            break;
        }

        if let Err(e) = threshold.codec().write_frame(&mut writer, &payload).await {
            tracing::warn!("Send loop ending: {}", e);
            break;
        }
        sent += 1;
    }

    let _ = writer.shutdown().await;
    tracing::debug!("Send loop exited after {} frames", sent);
}
