use std::string::FromUtf8Error;

/// Everything that can go wrong while turning bytes into packets (or back).
///
/// All variants are fatal for the packet being processed; the transport
/// decides whether that also ends the connection.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A VarInt ran past 5 bytes or does not fit in 32 bits.
    #[error("VarInt is too large")]
    VarIntTooLarge,

    /// The packet ended before a field could be read.
    #[error("unexpected end of packet data ({needed} more bytes needed)")]
    UnexpectedEof { needed: usize },

    /// The peer closed the stream in the middle of a frame.
    #[error("connection broken")]
    ConnectionBroken,

    /// The declared uncompressed length did not match, or the inflated
    /// payload is not above the threshold.
    #[error("invalid compressed packet: {0}")]
    InvalidCompressedPacket(String),

    /// The frame length prefix is negative, unreasonably large, or zero on a
    /// compressed stream.
    #[error("invalid frame length {0}")]
    InvalidFrameLength(i32),

    /// A frame decoded to zero bytes, so it carries no packet id.
    #[error("empty packet")]
    EmptyPacket,

    /// A length prefix inside a packet was negative.
    #[error("negative length prefix {0}")]
    NegativeLength(i32),

    #[error("invalid UTF-8 string: {0}")]
    InvalidString(#[from] FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;
