//! Length-prefixed framing with optional zlib compression.
//!
//! ```text
//! uncompressed:  VarInt(len) || payload
//! compressed:    VarInt(len) || VarInt(data_len) || (data_len == 0 ? payload : zlib(payload))
//! ```
//!
//! `payload` is always `VarInt(packet_id) || fields`. Compression is switched
//! on by the server during login; a negative threshold means it is off.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};
use crate::varint;

/// Threshold value meaning "compression disabled".
pub const COMPRESSION_DISABLED: i32 = -1;

/// Largest frame the 3-byte length prefix can describe.
pub const MAX_FRAME_LEN: i32 = 2_097_151;

/// Largest uncompressed payload we are willing to inflate.
pub const MAX_UNCOMPRESSED_LEN: i32 = 8_388_608;

/// Encoder/decoder for one frame, bound to a fixed threshold.
///
/// Cheap to copy; the transport takes a fresh one from
/// [`CompressionThreshold::codec`] for every frame so that a threshold change
/// never lands halfway through a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    threshold: i32,
}

impl FrameCodec {
    pub const fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    pub const fn uncompressed() -> Self {
        Self::new(COMPRESSION_DISABLED)
    }

    pub const fn threshold(&self) -> i32 {
        self.threshold
    }

    pub const fn compression_enabled(&self) -> bool {
        self.threshold >= 0
    }

    // ── Write path ──────────────────────────────────────────────────────

    /// Frame `payload` for the wire, compressing it if the threshold asks for it.
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        if !self.compression_enabled() {
            return Ok(prefix_len(payload));
        }

        let body = if (payload.len() as i64) < i64::from(self.threshold) {
            let mut body = Vec::with_capacity(payload.len() + 1);
            varint::write(&mut body, 0);
            body.extend_from_slice(payload);
            body
        } else {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(payload)?;
            let compressed = encoder.finish()?;
            let mut body = Vec::with_capacity(compressed.len() + varint::MAX_LEN);
            varint::write(&mut body, payload.len() as i32);
            body.extend_from_slice(&compressed);
            body
        };
        Ok(prefix_len(&body))
    }

    // ── Read path ───────────────────────────────────────────────────────

    /// Turn a frame body (everything after the length prefix) into the raw payload.
    pub fn decode_body(&self, body: &[u8]) -> Result<Vec<u8>> {
        if !self.compression_enabled() {
            return Ok(body.to_vec());
        }

        let (data_len, used) = varint::decode(body)?;
        let rest = &body[used..];
        if data_len == 0 {
            return Ok(rest.to_vec());
        }
        if !(0..=MAX_UNCOMPRESSED_LEN).contains(&data_len) {
            return Err(ProtocolError::InvalidCompressedPacket(format!(
                "declared length {data_len} out of range"
            )));
        }

        let mut inflated = Vec::with_capacity(data_len as usize);
        ZlibDecoder::new(rest)
            .take(data_len as u64 + 1)
            .read_to_end(&mut inflated)
            .map_err(|e| ProtocolError::InvalidCompressedPacket(format!("inflate failed: {e}")))?;

        if inflated.len() != data_len as usize {
            return Err(ProtocolError::InvalidCompressedPacket(format!(
                "declared {data_len} bytes, inflated to {}",
                inflated.len()
            )));
        }
        if inflated.len() as i64 <= i64::from(self.threshold) {
            return Err(ProtocolError::InvalidCompressedPacket(format!(
                "{} bytes is not above the threshold of {}",
                inflated.len(),
                self.threshold
            )));
        }
        Ok(inflated)
    }

    /// Read exactly one frame from `reader` and return its decoded payload.
    ///
    /// A zero length is an empty payload when compression is off; a
    /// compressed frame always carries at least the data-length marker.
    pub async fn read_frame<R>(&self, reader: &mut R) -> Result<Vec<u8>>
    where
        R: AsyncRead + Unpin,
    {
        let len = read_varint(reader).await?;
        if len == 0 && !self.compression_enabled() {
            return Ok(Vec::new());
        }
        if len <= 0 || len > MAX_FRAME_LEN {
            return Err(ProtocolError::InvalidFrameLength(len));
        }

        let mut body = vec![0u8; len as usize];
        reader.read_exact(&mut body).await.map_err(broken_on_eof)?;
        tracing::trace!("read frame: {} bytes (threshold {})", len, self.threshold);

        self.decode_body(&body)
    }

    /// Encode `payload` and write the whole frame to `writer`.
    pub async fn write_frame<W>(&self, writer: &mut W, payload: &[u8]) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let frame = self.encode(payload)?;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        tracing::trace!("wrote frame: {} bytes (threshold {})", frame.len(), self.threshold);
        Ok(())
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::uncompressed()
    }
}

/// The connection-wide compression threshold, shared between the receive
/// and send loops.
#[derive(Debug, Clone)]
pub struct CompressionThreshold(Arc<AtomicI32>);

impl CompressionThreshold {
    pub fn new(threshold: i32) -> Self {
        Self(Arc::new(AtomicI32::new(threshold)))
    }

    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, threshold: i32) {
        self.0.store(threshold, Ordering::Release);
    }

    /// Snapshot of the current threshold as a codec.
    pub fn codec(&self) -> FrameCodec {
        FrameCodec::new(self.get())
    }
}

impl Default for CompressionThreshold {
    fn default() -> Self {
        Self::new(COMPRESSION_DISABLED)
    }
}

fn prefix_len(body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(body.len() + varint::MAX_LEN);
    varint::write(&mut frame, body.len() as i32);
    frame.extend_from_slice(body);
    frame
}

/// Read a VarInt straight off the stream, one byte at a time.
pub async fn read_varint<R>(reader: &mut R) -> Result<i32>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::with_capacity(varint::MAX_LEN);
    loop {
        let byte = reader.read_u8().await.map_err(broken_on_eof)?;
        bytes.push(byte);
        if byte & 0x80 == 0 || bytes.len() == varint::MAX_LEN {
            return varint::decode(&bytes).map(|(value, _)| value);
        }
    }
}

fn broken_on_eof(e: std::io::Error) -> ProtocolError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::ConnectionBroken
    } else {
        ProtocolError::Io(e)
    }
}
