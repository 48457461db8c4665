//! VarInt and framing codec tests. Everything here is pure byte shuffling;
//! the async tests run over an in-memory duplex pipe.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use tokio::io::{AsyncWriteExt, duplex};

use ultimate_protocol::ProtocolError;
use ultimate_protocol::frame::{CompressionThreshold, FrameCodec, MAX_FRAME_LEN};
use ultimate_protocol::varint;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Payload with a packet id and `len - 1` bytes of mildly compressible data.
fn payload(len: usize) -> Vec<u8> {
    let mut p = Vec::with_capacity(len);
    if len > 0 {
        p.push(0x21);
    }
    p.extend((1..len).map(|i| (i % 13) as u8));
    p
}

/// Split a frame into (declared length, body), asserting the prefix is honest.
fn split_frame(frame: &[u8]) -> (usize, &[u8]) {
    let (len, used) = varint::decode(frame).unwrap();
    let body = &frame[used..];
    assert_eq!(len as usize, body.len(), "length prefix must cover the body exactly");
    (len as usize, body)
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut e = ZlibEncoder::new(Vec::new(), Compression::default());
    e.write_all(data).unwrap();
    e.finish().unwrap()
}

/// Hand-build a compressed frame body with an arbitrary declared length.
fn compressed_body(declared: i32, data: &[u8]) -> Vec<u8> {
    let mut body = varint::encode(declared);
    body.extend_from_slice(&zlib(data));
    body
}

// ---------------------------------------------------------------------------
// VarInt
// ---------------------------------------------------------------------------

#[test]
fn varint_round_trips_interesting_values() {
    let mut values = vec![0, 1, -1, 2, -2, 127, 128, 255, 256, i32::MAX, i32::MIN, i32::MAX - 1, i32::MIN + 1];
    for shift in 0..31 {
        values.push(1 << shift);
        values.push((1 << shift) - 1);
        values.push(-(1 << shift));
    }

    for v in values {
        let bytes = varint::encode(v);
        assert!((1..=5).contains(&bytes.len()));
        assert_eq!(varint::decode(&bytes).unwrap(), (v, bytes.len()), "round trip of {v}");
    }
}

#[test]
fn negative_varints_always_take_five_bytes() {
    for v in [-1, -2, -128, -65_536, i32::MIN, i32::MIN + 1] {
        assert_eq!(varint::encode(v).len(), 5, "encoding of {v}");
    }
}

#[test]
fn continuation_on_fifth_byte_is_rejected() {
    let err = varint::decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0x8F, 0x01]).unwrap_err();
    assert!(matches!(err, ProtocolError::VarIntTooLarge));
}

// ---------------------------------------------------------------------------
// Framing without compression
// ---------------------------------------------------------------------------

#[test]
fn uncompressed_frames_are_length_prefixed_payloads() {
    let codec = FrameCodec::uncompressed();
    for len in [0, 1, 2, 127, 128, 255, 256, 300, 5_000] {
        let p = payload(len);
        let frame = codec.encode(&p).unwrap();
        let (_, body) = split_frame(&frame);
        assert_eq!(body, &p[..]);
        assert_eq!(codec.decode_body(body).unwrap(), p, "len {len}");
    }
}

#[tokio::test]
async fn uncompressed_frames_survive_the_stream() {
    let (mut client, mut server) = duplex(64);
    let codec = FrameCodec::uncompressed();
    let sent: Vec<Vec<u8>> = [1, 40, 300, 2_000].into_iter().map(payload).collect();

    let to_send = sent.clone();
    let writer = tokio::spawn(async move {
        for p in &to_send {
            codec.write_frame(&mut client, p).await.unwrap();
        }
    });

    for expected in &sent {
        assert_eq!(&codec.read_frame(&mut server).await.unwrap(), expected);
    }
    writer.await.unwrap();
}

// ---------------------------------------------------------------------------
// Framing with compression
// ---------------------------------------------------------------------------

#[test]
fn below_threshold_payload_carries_zero_marker() {
    let codec = FrameCodec::new(256);
    let p = payload(100);
    let frame = codec.encode(&p).unwrap();
    let (_, body) = split_frame(&frame);

    assert_eq!(body[0], 0x00, "explicit VarInt(0) marker");
    assert_eq!(&body[1..], &p[..], "payload stored as-is");
    assert_eq!(codec.decode_body(body).unwrap(), p);
}

#[test]
fn above_threshold_payload_is_deflated() {
    let codec = FrameCodec::new(256);
    let p = payload(4_096);
    let frame = codec.encode(&p).unwrap();
    let (_, body) = split_frame(&frame);

    let (declared, used) = varint::decode(body).unwrap();
    assert_eq!(declared as usize, p.len());
    assert!(body.len() - used < p.len(), "deflated data should be smaller");
    assert_eq!(codec.decode_body(body).unwrap(), p);
}

#[test]
fn payload_exactly_at_threshold_is_deflated() {
    let codec = FrameCodec::new(64);
    let frame = codec.encode(&payload(64)).unwrap();
    let (_, body) = split_frame(&frame);
    assert_eq!(varint::decode(body).unwrap().0, 64);
}

#[test]
fn zero_threshold_compresses_everything_nonempty() {
    let codec = FrameCodec::new(0);
    let p = payload(10);
    let frame = codec.encode(&p).unwrap();
    let (_, body) = split_frame(&frame);
    assert_eq!(varint::decode(body).unwrap().0, 10);
    assert_eq!(codec.decode_body(body).unwrap(), p);
}

#[test]
fn declared_length_mismatch_is_rejected() {
    let codec = FrameCodec::new(16);
    let data = payload(100);
    let body = compressed_body(99, &data);
    assert!(matches!(
        codec.decode_body(&body),
        Err(ProtocolError::InvalidCompressedPacket(_))
    ));

    let body = compressed_body(101, &data);
    assert!(matches!(
        codec.decode_body(&body),
        Err(ProtocolError::InvalidCompressedPacket(_))
    ));
}

#[test]
fn inflated_length_not_above_threshold_is_rejected() {
    let codec = FrameCodec::new(256);
    for len in [10, 256] {
        let data = payload(len);
        let body = compressed_body(len as i32, &data);
        assert!(
            matches!(codec.decode_body(&body), Err(ProtocolError::InvalidCompressedPacket(_))),
            "inflated length {len} must be rejected"
        );
    }
}

#[test]
fn garbage_after_nonzero_marker_is_rejected() {
    let codec = FrameCodec::new(16);
    let mut body = varint::encode(64);
    body.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    assert!(matches!(
        codec.decode_body(&body),
        Err(ProtocolError::InvalidCompressedPacket(_))
    ));
}

#[tokio::test]
async fn compressed_frames_survive_the_stream() {
    let (mut client, mut server) = duplex(128);
    let codec = FrameCodec::new(256);
    let sent: Vec<Vec<u8>> = [3, 255, 257, 10_000].into_iter().map(payload).collect();

    let to_send = sent.clone();
    let writer = tokio::spawn(async move {
        for p in &to_send {
            codec.write_frame(&mut client, p).await.unwrap();
        }
    });

    for expected in &sent {
        assert_eq!(&codec.read_frame(&mut server).await.unwrap(), expected);
    }
    writer.await.unwrap();
}

// ---------------------------------------------------------------------------
// Stream edge cases
// ---------------------------------------------------------------------------

#[tokio::test]
async fn eof_mid_frame_is_connection_broken() {
    let (mut client, mut server) = duplex(64);
    // Claims 10 bytes, delivers 3.
    client.write_all(&[10, 0x01, 0x02, 0x03]).await.unwrap();
    drop(client);

    let err = FrameCodec::uncompressed().read_frame(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionBroken));
}

#[tokio::test]
async fn eof_before_length_is_connection_broken() {
    let (client, mut server) = duplex(64);
    drop(client);

    let err = FrameCodec::uncompressed().read_frame(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionBroken));
}

#[tokio::test]
async fn oversized_or_negative_length_is_rejected() {
    for len in [-1, MAX_FRAME_LEN + 1] {
        let (mut client, mut server) = duplex(64);
        client.write_all(&varint::encode(len)).await.unwrap();

        let err = FrameCodec::uncompressed().read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidFrameLength(l) if l == len));
    }
}

#[tokio::test]
async fn empty_payload_survives_the_stream() {
    let (mut client, mut server) = duplex(64);
    let codec = FrameCodec::uncompressed();
    codec.write_frame(&mut client, &[]).await.unwrap();
    codec.write_frame(&mut client, &[0x21, 7]).await.unwrap();

    assert_eq!(codec.read_frame(&mut server).await.unwrap(), Vec::<u8>::new());
    assert_eq!(codec.read_frame(&mut server).await.unwrap(), vec![0x21, 7]);
}

#[tokio::test]
async fn zero_length_is_rejected_once_compressed() {
    let (mut client, mut server) = duplex(64);
    client.write_all(&[0x00]).await.unwrap();

    let err = FrameCodec::new(256).read_frame(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidFrameLength(0)));
}

#[test]
fn shared_threshold_snapshots_are_independent() {
    let shared = CompressionThreshold::default();
    let before = shared.codec();
    shared.set(256);
    assert!(!before.compression_enabled());
    assert_eq!(shared.codec().threshold(), 256);
    assert_eq!(shared.clone().get(), 256);
}
