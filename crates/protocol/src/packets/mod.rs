//! Packet ids and layouts for protocol 340 (1.12.2).

pub mod clientbound;
pub mod ids;
pub mod serverbound;

/// Which id space a packet belongs to. The same numeric id means different
/// things in different states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Handshaking,
    Status,
    Login,
    Play,
}

impl ConnectionState {
    /// Value sent as "next state" in the handshake.
    pub const fn handshake_intent(&self) -> i32 {
        match self {
            ConnectionState::Status => 1,
            _ => 2,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::Status => "status",
            ConnectionState::Login => "login",
            ConnectionState::Play => "play",
        };
        f.write_str(name)
    }
}
