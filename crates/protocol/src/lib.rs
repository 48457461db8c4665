//! Wire-level building blocks for the Minecraft Java Edition protocol,
//! version 1.12.2.
//!
//! Nothing in here touches sockets directly except through the generic
//! `AsyncRead`/`AsyncWrite` helpers in [`frame`]; connection state, dispatch
//! and game logic live in the client crate.

pub mod buf;
pub mod error;
pub mod frame;
pub mod packets;
pub mod position;
pub mod varint;

pub use error::ProtocolError;

/// Protocol number sent in the handshake.
pub const PROTOCOL_VERSION: i32 = 340;

/// Human-readable game version matching [`PROTOCOL_VERSION`].
pub const VERSION_NAME: &str = "1.12.2";
