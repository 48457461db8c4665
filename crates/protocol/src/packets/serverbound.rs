//! Packet creators: each returns a ready-to-frame payload.

use crate::buf::PacketWriter;
use crate::packets::ConnectionState;
use crate::packets::ids::serverbound as id;

pub fn handshake(protocol_version: i32, host: &str, port: u16, next: ConnectionState) -> Vec<u8> {
    PacketWriter::new(id::HANDSHAKE)
        .varint(protocol_version)
        .string(host)
        .u16(port)
        .varint(next.handshake_intent())
        .finish()
}

pub fn login_start(username: &str) -> Vec<u8> {
    PacketWriter::new(id::LOGIN_START).string(username).finish()
}

pub fn teleport_confirm(teleport_id: i32) -> Vec<u8> {
    PacketWriter::new(id::TELEPORT_CONFIRM).varint(teleport_id).finish()
}

/// Client Status action asking the server to respawn us.
pub const STATUS_PERFORM_RESPAWN: i32 = 0;

pub fn client_status(action: i32) -> Vec<u8> {
    PacketWriter::new(id::CLIENT_STATUS).varint(action).finish()
}

pub fn keep_alive(keep_alive_id: i64) -> Vec<u8> {
    PacketWriter::new(id::KEEP_ALIVE).i64(keep_alive_id).finish()
}

/// `y` is the feet position.
pub fn player_position(x: f64, y: f64, z: f64, on_ground: bool) -> Vec<u8> {
    PacketWriter::new(id::PLAYER_POSITION)
        .f64(x)
        .f64(y)
        .f64(z)
        .bool(on_ground)
        .finish()
}

pub fn player_position_and_look(
    x: f64,
    y: f64,
    z: f64,
    yaw: f32,
    pitch: f32,
    on_ground: bool,
) -> Vec<u8> {
    PacketWriter::new(id::PLAYER_POSITION_AND_LOOK)
        .f64(x)
        .f64(y)
        .f64(z)
        .f32(yaw)
        .f32(pitch)
        .bool(on_ground)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_layout() {
        let payload = handshake(340, "localhost", 25565, ConnectionState::Login);
        let mut expected = vec![0x00, 0xD4, 0x02, 9];
        expected.extend_from_slice(b"localhost");
        expected.extend_from_slice(&[0x63, 0xDD, 0x02]);
        assert_eq!(payload, expected);
    }

    #[test]
    fn login_start_layout() {
        assert_eq!(login_start("bot"), [0x00, 0x03, b'b', b'o', b't']);
    }

    #[test]
    fn keep_alive_echoes_long() {
        assert_eq!(keep_alive(1), [0x0B, 0, 0, 0, 0, 0, 0, 0, 1]);
    }
}
