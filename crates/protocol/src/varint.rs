//! The protocol's variable-length signed 32-bit integer.
//!
//! Little-endian groups of 7 bits, high bit set on every byte except the last.
//! Negative values are encoded through their two's-complement `u32` bit
//! pattern, so they always take the full 5 bytes.

use crate::error::{ProtocolError, Result};

/// Longest legal encoding.
pub const MAX_LEN: usize = 5;

const SEGMENT_BITS: u32 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Append the encoding of `value` to `buf`.
pub fn write(buf: &mut Vec<u8>, value: i32) {
    let mut raw = value as u32;
    loop {
        if raw & !SEGMENT_BITS == 0 {
            buf.push(raw as u8);
            return;
        }
        buf.push((raw & SEGMENT_BITS) as u8 | CONTINUE_BIT);
        raw >>= 7;
    }
}

/// Encode `value` into a fresh buffer of 1 to 5 bytes.
pub fn encode(value: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_LEN);
    write(&mut buf, value);
    buf
}

/// Number of bytes `value` occupies on the wire.
pub fn len(value: i32) -> usize {
    let raw = value as u32;
    match raw {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0xFFF_FFFF => 4,
        _ => 5,
    }
}

/// Decode a VarInt from the front of `bytes`.
///
/// Returns the value and how many bytes it consumed.
pub fn decode(bytes: &[u8]) -> Result<(i32, usize)> {
    let mut raw: u64 = 0;
    for i in 0..MAX_LEN {
        let Some(&byte) = bytes.get(i) else {
            return Err(ProtocolError::UnexpectedEof { needed: 1 });
        };
        raw |= u64::from(byte & SEGMENT_BITS as u8) << (7 * i);
        if byte & CONTINUE_BIT == 0 {
            return Ok((to_signed(raw)?, i + 1));
        }
    }
    Err(ProtocolError::VarIntTooLarge)
}

/// Fold the accumulated bits back into an `i32`.
///
/// Anything in `i32::MAX + 1 ..= u32::MAX` is a negative number; anything
/// wider than 32 bits cannot have come from a legal encoder.
fn to_signed(raw: u64) -> Result<i32> {
    if raw > u64::from(u32::MAX) {
        return Err(ProtocolError::VarIntTooLarge);
    }
    Ok(raw as u32 as i32)
}
