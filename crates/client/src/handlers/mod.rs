pub mod entity;
pub mod login;
pub mod play;

use ultimate_protocol::packets::ConnectionState::{Login, Play};
use ultimate_protocol::packets::ids;

use crate::dispatch::DispatchTable;

/// The standard handler set for protocol 340: login, keep-alive, player
/// state, world state and entity tracking.
pub fn standard() -> DispatchTable {
    let mut table = DispatchTable::new();

    table.register(Login, ids::login::DISCONNECT, login::disconnect);
    table.register(Login, ids::login::ENCRYPTION_REQUEST, login::encryption_request);
    table.register(Login, ids::login::LOGIN_SUCCESS, login::login_success);
    table.register(Login, ids::login::SET_COMPRESSION, login::set_compression);

    table.register(Play, ids::play::KEEP_ALIVE, play::keep_alive);
    table.register(Play, ids::play::DISCONNECT, play::disconnect);
    table.register(Play, ids::play::JOIN_GAME, play::join_game);
    table.register(Play, ids::play::CHAT_MESSAGE, play::chat_message);
    table.register(Play, ids::play::PLAYER_POSITION_AND_LOOK, play::position_and_look);
    table.register(Play, ids::play::UPDATE_HEALTH, play::update_health);
    table.register(Play, ids::play::RESPAWN, play::respawn);
    table.register(Play, ids::play::TIME_UPDATE, play::time_update);
    table.register(Play, ids::play::SPAWN_POSITION, play::spawn_position);
    table.register(Play, ids::play::CHANGE_GAME_STATE, play::change_game_state);

    table.register(Play, ids::play::SPAWN_OBJECT, entity::spawn_object);
    table.register(Play, ids::play::SPAWN_MOB, entity::spawn_mob);
    table.register(Play, ids::play::SPAWN_PLAYER, entity::spawn_player);
    table.register(Play, ids::play::ENTITY, entity::entity_idle);
    table.register(Play, ids::play::ENTITY_RELATIVE_MOVE, entity::relative_move);
    table.register(Play, ids::play::ENTITY_LOOK_AND_RELATIVE_MOVE, entity::look_and_relative_move);
    table.register(Play, ids::play::ENTITY_LOOK, entity::look);
    table.register(Play, ids::play::ENTITY_TELEPORT, entity::teleport);
    table.register(Play, ids::play::DESTROY_ENTITIES, entity::destroy);

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_scoped_by_state() {
        let table = standard();
        // 0x00 is Disconnect in login and Spawn Object in play.
        assert!(table.contains(Login, 0x00));
        assert!(table.contains(Play, 0x00));
        // Set Compression only exists during login.
        assert!(!table.contains(Play, ids::login::SET_COMPRESSION));
        assert!(!table.contains(Login, ids::play::KEEP_ALIVE));
    }
}
