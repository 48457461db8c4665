//! Primitive field encodings.
//!
//! Everything multi-byte is big-endian, strings are VarInt length-prefixed
//! UTF-8, booleans are a single `0`/`1` byte.

use uuid::Uuid;

use crate::error::{ProtocolError, Result};
use crate::position::BlockPos;
use crate::varint;

/// Builds an outbound payload: `VarInt(packet_id) || fields`.
#[derive(Debug, Clone)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    /// Start a payload with its packet id already written.
    pub fn new(packet_id: i32) -> Self {
        let mut buf = Vec::with_capacity(32);
        varint::write(&mut buf, packet_id);
        Self { buf }
    }

    pub fn varint(&mut self, value: i32) -> &mut Self {
        varint::write(&mut self.buf, value);
        self
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.buf.push(value as u8);
        self
    }

    pub fn i8(&mut self, value: i8) -> &mut Self {
        self.buf.push(value as u8);
        self
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn f32(&mut self, value: f32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn f64(&mut self, value: f64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        varint::write(&mut self.buf, value.len() as i32);
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn position(&mut self, pos: BlockPos) -> &mut Self {
        self.i64(pos.pack())
    }

    pub fn uuid(&mut self, value: Uuid) -> &mut Self {
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    /// Finish and hand over the payload bytes.
    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// Cursor over an inbound payload.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ProtocolError::UnexpectedEof {
                needed: n - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn varint(&mut self) -> Result<i32> {
        let (value, used) = varint::decode(&self.data[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    pub fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn i8(&mut self) -> Result<i8> {
        Ok(self.u8()? as i8)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    pub fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.array()?))
    }

    pub fn string(&mut self) -> Result<String> {
        let len = self.varint()?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))?;
        Ok(String::from_utf8(self.take(len)?.to_vec())?)
    }

    pub fn position(&mut self) -> Result<BlockPos> {
        Ok(BlockPos::unpack(self.i64()?))
    }

    pub fn uuid(&mut self) -> Result<Uuid> {
        Ok(Uuid::from_bytes(self.array()?))
    }

    /// Rotation in 1/256ths of a full turn, converted to degrees.
    pub fn angle(&mut self) -> Result<f32> {
        Ok(self.u8()? as f32 * 360.0 / 256.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_layout_is_big_endian() {
        let payload = PacketWriter::new(0x0D)
            .i16(-2)
            .i32(0x0102_0304)
            .f32(1.0)
            .bool(true)
            .string("hi")
            .finish();
        assert_eq!(
            payload,
            [0x0D, 0xFF, 0xFE, 0x01, 0x02, 0x03, 0x04, 0x3F, 0x80, 0x00, 0x00, 0x01, 0x02, b'h', b'i']
        );
    }

    #[test]
    fn reader_walks_fields_in_order() {
        let payload = PacketWriter::new(0x2F)
            .f64(12.5)
            .i64(-7)
            .u16(25565)
            .string("steve")
            .position(BlockPos::new(-5, 64, 9))
            .finish();
        let mut r = PacketReader::new(&payload);
        assert_eq!(r.varint().unwrap(), 0x2F);
        assert_eq!(r.f64().unwrap(), 12.5);
        assert_eq!(r.i64().unwrap(), -7);
        assert_eq!(r.u16().unwrap(), 25565);
        assert_eq!(r.string().unwrap(), "steve");
        assert_eq!(r.position().unwrap(), BlockPos::new(-5, 64, 9));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn short_read_reports_missing_bytes() {
        let mut r = PacketReader::new(&[0x00, 0x01]);
        assert!(matches!(r.i32(), Err(ProtocolError::UnexpectedEof { needed: 2 })));
    }

    #[test]
    fn angle_maps_byte_to_degrees() {
        let mut r = PacketReader::new(&[64, 128]);
        assert_eq!(r.angle().unwrap(), 90.0);
        assert_eq!(r.angle().unwrap(), 180.0);
    }
}
