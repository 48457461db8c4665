//! Transport tests: task lifecycle, framing over a real socket, lockstep.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use ultimate_client::error::ClientError;
use ultimate_client::net::{Connection, LinkState, queue};
use ultimate_protocol::frame::FrameCodec;
use ultimate_protocol::{ProtocolError, varint};

const WAIT: Duration = Duration::from_secs(3);

async fn connected() -> (Connection, tokio::net::TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let mut conn = Connection::new().with_join_timeout(Duration::from_secs(1));
    let (connect, accept) = tokio::join!(conn.connect(&addr, WAIT), listener.accept());
    connect.unwrap();
    let (peer, _) = accept.unwrap();
    (conn, peer)
}

#[tokio::test]
async fn second_start_is_rejected() {
    let (mut conn, _peer) = connected().await;
    assert_eq!(conn.link_state(), LinkState::Connected);

    let (in_tx, _inbound) = queue::inbound();
    conn.start_listener(in_tx.clone()).await.unwrap();
    assert!(conn.is_listening());
    assert!(matches!(
        conn.start_listener(in_tx).await,
        Err(ClientError::AlreadyRunning("listener"))
    ));

    let (_out, out_rx) = queue::outbound();
    conn.start_sender(out_rx).await.unwrap();
    let (_out2, out_rx2) = queue::outbound();
    assert!(matches!(
        conn.start_sender(out_rx2).await,
        Err(ClientError::AlreadyRunning("sender"))
    ));

    conn.close().await;
}

#[tokio::test]
async fn close_is_idempotent_and_stops_tasks() {
    let (mut conn, mut peer) = connected().await;
    let (in_tx, mut inbound) = queue::inbound();
    let (_out, out_rx) = queue::outbound();
    conn.start_listener(in_tx).await.unwrap();
    conn.start_sender(out_rx).await.unwrap();

    conn.close().await;
    conn.close().await;
    assert_eq!(conn.link_state(), LinkState::Closed);
    assert!(!conn.is_listening());
    assert!(!conn.is_sending());

    // Consumers see the sentinel; the peer sees EOF.
    assert!(matches!(inbound.recv(WAIT).await, Err(ClientError::ConnectionClosed)));
    let mut buf = [0u8; 1];
    assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn close_without_tasks_is_fine() {
    let mut conn = Connection::new();
    conn.close().await;
    assert_eq!(conn.link_state(), LinkState::Closed);

    let (in_tx, _inbound) = queue::inbound();
    assert!(matches!(
        conn.start_listener(in_tx).await,
        Err(ClientError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn frames_flow_both_ways() {
    let (mut conn, mut peer) = connected().await;
    let (in_tx, mut inbound) = queue::inbound();
    let (outbound, out_rx) = queue::outbound();
    conn.start_listener(in_tx).await.unwrap();
    conn.start_sender(out_rx).await.unwrap();

    let codec = FrameCodec::uncompressed();
    codec.write_frame(&mut peer, &[0x1F, 1, 2, 3]).await.unwrap();
    assert_eq!(inbound.recv(WAIT).await.unwrap(), vec![0x1F, 1, 2, 3]);

    assert!(outbound.send(vec![0x0B, 9]));
    let echoed = tokio::time::timeout(WAIT, codec.read_frame(&mut peer))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(echoed, vec![0x0B, 9]);

    // Sentinel stops the send task, which half-closes the socket.
    outbound.close();
    let mut buf = [0u8; 1];
    assert_eq!(peer.read(&mut buf).await.unwrap(), 0);

    conn.close().await;
}

#[tokio::test]
async fn peer_hangup_pushes_sentinel() {
    let (mut conn, peer) = connected().await;
    let (in_tx, mut inbound) = queue::inbound();
    conn.start_listener(in_tx).await.unwrap();

    drop(peer);
    assert!(matches!(inbound.recv(WAIT).await, Err(ClientError::ConnectionClosed)));
    conn.close().await;
}

#[tokio::test]
async fn close_flushes_payloads_queued_ahead_of_the_sentinel() {
    let (mut conn, mut peer) = connected().await;
    let (outbound, out_rx) = queue::outbound();
    conn.start_sender(out_rx).await.unwrap();

    for i in 1..=50u8 {
        outbound.send(vec![0x0B, i]);
    }
    outbound.close();
    conn.close().await;

    let codec = FrameCodec::uncompressed();
    for i in 1..=50u8 {
        assert_eq!(codec.read_frame(&mut peer).await.unwrap(), vec![0x0B, i]);
    }
    let mut buf = [0u8; 1];
    assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn bad_frame_reaches_the_consumer_as_protocol_error() {
    let (mut conn, mut peer) = connected().await;
    let (in_tx, mut inbound) = queue::inbound();
    conn.start_listener(in_tx).await.unwrap();

    peer.write_all(&varint::encode(-1)).await.unwrap();
    let err = inbound.recv(WAIT).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Protocol(ProtocolError::InvalidFrameLength(-1))
    ));
    // Then the ordinary sentinel.
    assert!(matches!(inbound.recv(WAIT).await, Err(ClientError::ConnectionClosed)));
    conn.close().await;
}

#[tokio::test]
async fn lockstep_applies_threshold_before_next_frame() {
    let (mut conn, mut peer) = connected().await;
    let (in_tx, mut inbound) = queue::inbound();
    conn.set_lockstep(true);
    conn.start_listener(in_tx).await.unwrap();

    // Both frames are on the wire before the consumer reacts to the first.
    let plain = FrameCodec::uncompressed();
    let compressed = FrameCodec::new(64);
    plain.write_frame(&mut peer, &[0x03, 64]).await.unwrap();
    compressed.write_frame(&mut peer, &[0x02, 7]).await.unwrap();

    assert_eq!(inbound.recv(WAIT).await.unwrap(), vec![0x03, 64]);
    conn.set_compression_threshold(64);
    conn.ack_frame();
    assert_eq!(inbound.recv(WAIT).await.unwrap(), vec![0x02, 7]);
    assert_eq!(conn.compression_threshold(), 64);

    conn.set_lockstep(false);
    conn.close().await;
}

#[tokio::test]
async fn connect_failure_is_not_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let mut conn = Connection::new();
    let err = conn.connect(&addr, WAIT).await.unwrap_err();
    assert!(matches!(err, ClientError::Connect { .. }));
    assert_eq!(conn.link_state(), LinkState::Unconnected);
}
