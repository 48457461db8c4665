//! Clientbound packet layouts.
//!
//! Each struct decodes from a [`PacketReader`] positioned just after the
//! packet id. Trailing fields we have no use for (entity metadata, chunk
//! data) are left unread.

use uuid::Uuid;

use crate::buf::PacketReader;
use crate::error::Result;
use crate::position::BlockPos;

/// Decode a packet body (everything after the id).
pub trait Decode: Sized {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self>;
}

// ── Login ───────────────────────────────────────────────────────────────

/// Disconnect, in both login and play. `reason` is a JSON chat component.
#[derive(Debug, Clone, PartialEq)]
pub struct Disconnect {
    pub reason: String,
}

impl Decode for Disconnect {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self { reason: r.string()? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionRequest {
    pub server_id: String,
}

impl Decode for EncryptionRequest {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self { server_id: r.string()? })
    }
}

/// In 1.12.2 the UUID is sent as a string.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginSuccess {
    pub uuid: String,
    pub username: String,
}

impl Decode for LoginSuccess {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            uuid: r.string()?,
            username: r.string()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetCompression {
    pub threshold: i32,
}

impl Decode for SetCompression {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self { threshold: r.varint()? })
    }
}

// ── Play: connection & player ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeepAlive {
    pub id: i64,
}

impl Decode for KeepAlive {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self { id: r.i64()? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinGame {
    pub entity_id: i32,
    /// Bit 3 (0x8) is the hardcore flag.
    pub gamemode: u8,
    pub dimension: i32,
    pub difficulty: u8,
    pub max_players: u8,
    pub level_type: String,
    pub reduced_debug_info: bool,
}

impl Decode for JoinGame {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            entity_id: r.i32()?,
            gamemode: r.u8()?,
            dimension: r.i32()?,
            difficulty: r.u8()?,
            max_players: r.u8()?,
            level_type: r.string()?,
            reduced_debug_info: r.bool()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub json: String,
    /// 0 = chat, 1 = system, 2 = action bar.
    pub position: i8,
}

impl Decode for ChatMessage {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            json: r.string()?,
            position: r.i8()?,
        })
    }
}

/// Relative-coordinate bits in [`PlayerPositionAndLook::flags`].
pub mod relative {
    pub const X: u8 = 0x01;
    pub const Y: u8 = 0x02;
    pub const Z: u8 = 0x04;
    pub const YAW: u8 = 0x08;
    pub const PITCH: u8 = 0x10;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPositionAndLook {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub flags: u8,
    pub teleport_id: i32,
}

impl PlayerPositionAndLook {
    pub const fn is_relative(&self, bit: u8) -> bool {
        self.flags & bit != 0
    }
}

impl Decode for PlayerPositionAndLook {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            x: r.f64()?,
            y: r.f64()?,
            z: r.f64()?,
            yaw: r.f32()?,
            pitch: r.f32()?,
            flags: r.u8()?,
            teleport_id: r.varint()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateHealth {
    pub health: f32,
    pub food: i32,
    pub saturation: f32,
}

impl Decode for UpdateHealth {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            health: r.f32()?,
            food: r.varint()?,
            saturation: r.f32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Respawn {
    pub dimension: i32,
    pub difficulty: u8,
    pub gamemode: u8,
    pub level_type: String,
}

impl Decode for Respawn {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            dimension: r.i32()?,
            difficulty: r.u8()?,
            gamemode: r.u8()?,
            level_type: r.string()?,
        })
    }
}

// ── Play: world ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUpdate {
    pub world_age: i64,
    /// Negative means the daylight cycle is frozen.
    pub time_of_day: i64,
}

impl Decode for TimeUpdate {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            world_age: r.i64()?,
            time_of_day: r.i64()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPosition {
    pub location: BlockPos,
}

impl Decode for SpawnPosition {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            location: r.position()?,
        })
    }
}

/// Change Game State reasons we care about.
pub mod game_state {
    pub const END_RAINING: u8 = 1;
    pub const BEGIN_RAINING: u8 = 2;
    pub const CHANGE_GAMEMODE: u8 = 3;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeGameState {
    pub reason: u8,
    pub value: f32,
}

impl Decode for ChangeGameState {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            reason: r.u8()?,
            value: r.f32()?,
        })
    }
}

// ── Play: entities ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnObject {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub kind: i8,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pitch: f32,
    pub yaw: f32,
}

impl Decode for SpawnObject {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            entity_id: r.varint()?,
            uuid: r.uuid()?,
            kind: r.i8()?,
            x: r.f64()?,
            y: r.f64()?,
            z: r.f64()?,
            pitch: r.angle()?,
            yaw: r.angle()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnMob {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub kind: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Decode for SpawnMob {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            entity_id: r.varint()?,
            uuid: r.uuid()?,
            kind: r.varint()?,
            x: r.f64()?,
            y: r.f64()?,
            z: r.f64()?,
            yaw: r.angle()?,
            pitch: r.angle()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPlayer {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Decode for SpawnPlayer {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            entity_id: r.varint()?,
            uuid: r.uuid()?,
            x: r.f64()?,
            y: r.f64()?,
            z: r.f64()?,
            yaw: r.angle()?,
            pitch: r.angle()?,
        })
    }
}

/// Fixed-point movement delta: `(new * 32 - old * 32) * 128`.
fn delta(raw: i16) -> f64 {
    f64::from(raw) / 4096.0
}

/// Entity Relative Move and Entity Look And Relative Move. `look` is only
/// present for the latter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityMove {
    pub entity_id: i32,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub look: Option<(f32, f32)>,
    pub on_ground: bool,
}

impl EntityMove {
    pub fn decode_relative(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            entity_id: r.varint()?,
            dx: delta(r.i16()?),
            dy: delta(r.i16()?),
            dz: delta(r.i16()?),
            look: None,
            on_ground: r.bool()?,
        })
    }

    pub fn decode_look_and_relative(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            entity_id: r.varint()?,
            dx: delta(r.i16()?),
            dy: delta(r.i16()?),
            dz: delta(r.i16()?),
            look: Some((r.angle()?, r.angle()?)),
            on_ground: r.bool()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityLook {
    pub entity_id: i32,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Decode for EntityLook {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            entity_id: r.varint()?,
            yaw: r.angle()?,
            pitch: r.angle()?,
            on_ground: r.bool()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityTeleport {
    pub entity_id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Decode for EntityTeleport {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            entity_id: r.varint()?,
            x: r.f64()?,
            y: r.f64()?,
            z: r.f64()?,
            yaw: r.angle()?,
            pitch: r.angle()?,
            on_ground: r.bool()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestroyEntities {
    pub entity_ids: Vec<i32>,
}

impl Decode for DestroyEntities {
    fn decode(r: &mut PacketReader<'_>) -> Result<Self> {
        let count = r.varint()?;
        let entity_ids = (0..count.max(0))
            .map(|_| r.varint())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entity_ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buf::PacketWriter;

    #[test]
    fn position_and_look_with_relative_flags() {
        let payload = PacketWriter::new(0x2F)
            .f64(1.0)
            .f64(-2.0)
            .f64(3.5)
            .f32(90.0)
            .f32(0.0)
            .u8(relative::Y | relative::PITCH)
            .varint(42)
            .finish();
        let mut r = PacketReader::new(&payload);
        r.varint().unwrap();
        let p = PlayerPositionAndLook::decode(&mut r).unwrap();
        assert_eq!(p.teleport_id, 42);
        assert!(p.is_relative(relative::Y));
        assert!(p.is_relative(relative::PITCH));
        assert!(!p.is_relative(relative::X));
    }

    #[test]
    fn relative_move_is_fixed_point() {
        let payload = PacketWriter::new(0x26)
            .varint(7)
            .i16(4096)
            .i16(-2048)
            .i16(0)
            .bool(true)
            .finish();
        let mut r = PacketReader::new(&payload);
        r.varint().unwrap();
        let m = EntityMove::decode_relative(&mut r).unwrap();
        assert_eq!((m.entity_id, m.dx, m.dy, m.dz), (7, 1.0, -0.5, 0.0));
        assert!(m.on_ground);
    }
}
