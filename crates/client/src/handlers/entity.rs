//! Entity tracking. Only positions and look are kept; metadata is ignored.

use ultimate_protocol::buf::PacketReader;
use ultimate_protocol::packets::clientbound::{
    Decode, DestroyEntities, EntityLook, EntityMove, EntityTeleport, SpawnMob, SpawnObject,
    SpawnPlayer,
};

use crate::dispatch::{Action, HandlerContext};
use crate::error::Result;
use crate::game::entity::{Entity, EntityKind};

pub fn spawn_object(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let p = SpawnObject::decode(r)?;
    let mut entity = Entity::new(p.entity_id, p.uuid, EntityKind::Object(p.kind), p.x, p.y, p.z);
    entity.yaw = p.yaw;
    entity.pitch = p.pitch;
    ctx.game.entities().insert(p.entity_id, entity);
    Ok(Action::None)
}

pub fn spawn_mob(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let p = SpawnMob::decode(r)?;
    let mut entity = Entity::new(p.entity_id, p.uuid, EntityKind::Mob(p.kind), p.x, p.y, p.z);
    entity.yaw = p.yaw;
    entity.pitch = p.pitch;
    ctx.game.entities().insert(p.entity_id, entity);
    Ok(Action::None)
}

pub fn spawn_player(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let p = SpawnPlayer::decode(r)?;
    tracing::debug!("Player {} spawned as entity {}", p.uuid, p.entity_id);
    let mut entity = Entity::new(p.entity_id, p.uuid, EntityKind::Player, p.x, p.y, p.z);
    entity.yaw = p.yaw;
    entity.pitch = p.pitch;
    ctx.game.entities().insert(p.entity_id, entity);
    Ok(Action::None)
}

/// Bare "Entity" packet: a keep-alive for the entity, no data.
pub fn entity_idle(r: &mut PacketReader<'_>, _ctx: &HandlerContext<'_>) -> Result<Action> {
    let _entity_id = r.varint()?;
    Ok(Action::None)
}

fn apply_move(ctx: &HandlerContext<'_>, m: EntityMove) {
    // Moves for entities we never saw spawn are dropped.
    if let Some(mut entity) = ctx.game.entities().get_mut(&m.entity_id) {
        entity.translate(m.dx, m.dy, m.dz);
        if let Some((yaw, pitch)) = m.look {
            entity.yaw = yaw;
            entity.pitch = pitch;
        }
        entity.on_ground = m.on_ground;
    }
}

pub fn relative_move(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    apply_move(ctx, EntityMove::decode_relative(r)?);
    Ok(Action::None)
}

pub fn look_and_relative_move(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    apply_move(ctx, EntityMove::decode_look_and_relative(r)?);
    Ok(Action::None)
}

pub fn look(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let p = EntityLook::decode(r)?;
    if let Some(mut entity) = ctx.game.entities().get_mut(&p.entity_id) {
        entity.yaw = p.yaw;
        entity.pitch = p.pitch;
        entity.on_ground = p.on_ground;
    }
    Ok(Action::None)
}

pub fn teleport(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let p = EntityTeleport::decode(r)?;
    if let Some(mut entity) = ctx.game.entities().get_mut(&p.entity_id) {
        entity.x = p.x;
        entity.y = p.y;
        entity.z = p.z;
        entity.yaw = p.yaw;
        entity.pitch = p.pitch;
        entity.on_ground = p.on_ground;
    }
    Ok(Action::None)
}

pub fn destroy(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let p = DestroyEntities::decode(r)?;
    for id in &p.entity_ids {
        ctx.game.entities().remove(id);
    }
    tracing::trace!("Destroyed {} entities", p.entity_ids.len());
    Ok(Action::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameState;
    use crate::net::queue;
    use ultimate_protocol::buf::PacketWriter;
    use ultimate_protocol::packets::ids;
    use uuid::Uuid;

    fn body(payload: &[u8]) -> PacketReader<'_> {
        let mut r = PacketReader::new(payload);
        r.varint().unwrap();
        r
    }

    #[test]
    fn spawn_move_destroy() {
        let game = GameState::new();
        let (out, _rx) = queue::outbound();
        let ctx = HandlerContext::new(&game, &out);

        let spawn = PacketWriter::new(ids::play::SPAWN_PLAYER)
            .varint(5)
            .uuid(Uuid::nil())
            .f64(0.0)
            .f64(64.0)
            .f64(0.0)
            .u8(64)
            .u8(0)
            .finish();
        spawn_player(&mut body(&spawn), &ctx).unwrap();
        assert_eq!(game.entity(5).unwrap().yaw, 90.0);

        let step = PacketWriter::new(ids::play::ENTITY_RELATIVE_MOVE)
            .varint(5)
            .i16(4096 * 2)
            .i16(0)
            .i16(-4096)
            .bool(true)
            .finish();
        relative_move(&mut body(&step), &ctx).unwrap();
        let moved = game.entity(5).unwrap();
        assert_eq!((moved.x, moved.y, moved.z), (2.0, 64.0, -1.0));
        assert!(moved.on_ground);

        let gone = PacketWriter::new(ids::play::DESTROY_ENTITIES)
            .varint(2)
            .varint(5)
            .varint(99)
            .finish();
        destroy(&mut body(&gone), &ctx).unwrap();
        assert!(game.entities().is_empty());
    }

    #[test]
    fn move_for_unknown_entity_is_ignored() {
        let game = GameState::new();
        let (out, _rx) = queue::outbound();
        let ctx = HandlerContext::new(&game, &out);

        let step = PacketWriter::new(ids::play::ENTITY_RELATIVE_MOVE)
            .varint(1)
            .i16(1)
            .i16(1)
            .i16(1)
            .bool(false)
            .finish();
        relative_move(&mut body(&step), &ctx).unwrap();
        assert!(game.entities().is_empty());
    }
}
