//! Play-state handlers for the connection, the local player and the world.

use ultimate_protocol::buf::PacketReader;
use ultimate_protocol::packets::clientbound::{
    ChangeGameState, ChatMessage, Decode, Disconnect, JoinGame, KeepAlive, PlayerPositionAndLook,
    Respawn, SpawnPosition, TimeUpdate, UpdateHealth, game_state, relative,
};
use ultimate_protocol::packets::serverbound;

use crate::chat;
use crate::dispatch::{Action, HandlerContext};
use crate::error::{ClientError, Result};
use crate::game::{ChatLine, PlayerPosition};

const HARDCORE_BIT: u8 = 0x08;

// ── Connection ──────────────────────────────────────────────────────────

pub fn keep_alive(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = KeepAlive::decode(r)?;
    tracing::trace!("Keep alive {}", packet.id);
    ctx.send(serverbound::keep_alive(packet.id));
    Ok(Action::None)
}

pub fn disconnect(r: &mut PacketReader<'_>, _ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = Disconnect::decode(r)?;
    Err(ClientError::ServerDisconnect(chat::plain_text(&packet.reason)))
}

// ── Player ──────────────────────────────────────────────────────────────

pub fn join_game(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = JoinGame::decode(r)?;
    tracing::info!(
        "Joined game as entity {} (gamemode {}, dimension {})",
        packet.entity_id,
        packet.gamemode & !HARDCORE_BIT,
        packet.dimension
    );
    ctx.game.update_player(|p| {
        p.entity_id = Some(packet.entity_id);
        p.gamemode = packet.gamemode & !HARDCORE_BIT;
        p.hardcore = packet.gamemode & HARDCORE_BIT != 0;
        p.dimension = packet.dimension;
    });
    ctx.game.update_world(|w| {
        w.difficulty = packet.difficulty;
        w.max_players = packet.max_players;
        w.level_type = packet.level_type;
    });
    Ok(Action::None)
}

pub fn chat_message(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = ChatMessage::decode(r)?;
    let text = chat::plain_text(&packet.json);
    if packet.position != 2 {
        tracing::info!("[chat] {}", text);
    }
    ctx.game.push_chat(ChatLine {
        position: packet.position,
        text,
    });
    Ok(Action::None)
}

/// Server-side teleport. Flagged fields are offsets from where we are.
pub fn position_and_look(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = PlayerPositionAndLook::decode(r)?;

    let pos = ctx.game.position().replace_with(|current| {
        let base = current.unwrap_or_default();
        let pick = |bit: u8, offset: f64, absolute: f64| {
            if packet.is_relative(bit) { offset + absolute } else { absolute }
        };
        PlayerPosition {
            x: pick(relative::X, base.x, packet.x),
            y: pick(relative::Y, base.y, packet.y),
            z: pick(relative::Z, base.z, packet.z),
            yaw: pick(relative::YAW, f64::from(base.yaw), f64::from(packet.yaw)) as f32,
            pitch: pick(relative::PITCH, f64::from(base.pitch), f64::from(packet.pitch)) as f32,
            on_ground: base.on_ground,
        }
    });

    tracing::debug!(
        "Server moved us to ({:.3}, {:.3}, {:.3}), teleport {}",
        pos.x,
        pos.y,
        pos.z,
        packet.teleport_id
    );
    ctx.send(serverbound::teleport_confirm(packet.teleport_id));
    ctx.send(serverbound::player_position_and_look(
        pos.x,
        pos.y,
        pos.z,
        pos.yaw,
        pos.pitch,
        pos.on_ground,
    ));
    Ok(Action::None)
}

pub fn update_health(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = UpdateHealth::decode(r)?;
    ctx.game.update_player(|p| {
        p.health = packet.health;
        p.food = packet.food;
        p.saturation = packet.saturation;
    });

    if packet.health <= 0.0 {
        tracing::info!("Player died, requesting respawn");
        if let Some(movement) = ctx.movement {
            movement.clear_targets();
        }
        ctx.send(serverbound::client_status(serverbound::STATUS_PERFORM_RESPAWN));
    } else {
        tracing::debug!(
            "Health {:.1}, food {}, saturation {:.1}",
            packet.health,
            packet.food,
            packet.saturation
        );
    }
    Ok(Action::None)
}

pub fn respawn(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = Respawn::decode(r)?;
    tracing::info!("Respawned in dimension {}", packet.dimension);
    ctx.game.update_player(|p| {
        p.dimension = packet.dimension;
        p.gamemode = packet.gamemode & !HARDCORE_BIT;
    });
    ctx.game.update_world(|w| {
        w.difficulty = packet.difficulty;
        w.level_type = packet.level_type;
    });
    // Entity ids are per-dimension.
    ctx.game.entities().clear();
    Ok(Action::None)
}

// ── World ───────────────────────────────────────────────────────────────

pub fn time_update(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = TimeUpdate::decode(r)?;
    ctx.game.update_world(|w| {
        w.world_age = packet.world_age;
        w.time_of_day = packet.time_of_day;
    });
    Ok(Action::None)
}

pub fn spawn_position(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = SpawnPosition::decode(r)?;
    tracing::debug!("World spawn at {:?}", packet.location);
    ctx.game.update_world(|w| w.spawn = Some(packet.location));
    Ok(Action::None)
}

pub fn change_game_state(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = ChangeGameState::decode(r)?;
    match packet.reason {
        game_state::BEGIN_RAINING => ctx.game.update_world(|w| w.raining = true),
        game_state::END_RAINING => ctx.game.update_world(|w| w.raining = false),
        game_state::CHANGE_GAMEMODE => {
            let gamemode = packet.value as u8;
            tracing::info!("Game mode changed to {}", gamemode);
            ctx.game.update_player(|p| p.gamemode = gamemode);
        }
        _ => {}
    }
    Ok(Action::None)
}
