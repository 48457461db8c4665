// ── Serverbound ─────────────────────────────────────────────────────────

pub mod serverbound {
    pub const HANDSHAKE: i32 = 0x00;

    pub const LOGIN_START: i32 = 0x00;

    pub const TELEPORT_CONFIRM: i32 = 0x00;
    pub const CLIENT_STATUS: i32 = 0x03;
    pub const KEEP_ALIVE: i32 = 0x0B;
    pub const PLAYER_POSITION: i32 = 0x0D;
    pub const PLAYER_POSITION_AND_LOOK: i32 = 0x0E;
}

// ── Clientbound ─────────────────────────────────────────────────────────

pub mod login {
    pub const DISCONNECT: i32 = 0x00;
    pub const ENCRYPTION_REQUEST: i32 = 0x01;
    pub const LOGIN_SUCCESS: i32 = 0x02;
    pub const SET_COMPRESSION: i32 = 0x03;
}

pub mod play {
    pub const SPAWN_OBJECT: i32 = 0x00;
    pub const SPAWN_MOB: i32 = 0x03;
    pub const SPAWN_PLAYER: i32 = 0x05;
    pub const CHAT_MESSAGE: i32 = 0x0F;
    pub const DISCONNECT: i32 = 0x1A;
    pub const CHANGE_GAME_STATE: i32 = 0x1E;
    pub const KEEP_ALIVE: i32 = 0x1F;
    pub const CHUNK_DATA: i32 = 0x20;
    pub const JOIN_GAME: i32 = 0x23;
    pub const ENTITY: i32 = 0x25;
    pub const ENTITY_RELATIVE_MOVE: i32 = 0x26;
    pub const ENTITY_LOOK_AND_RELATIVE_MOVE: i32 = 0x27;
    pub const ENTITY_LOOK: i32 = 0x28;
    pub const PLAYER_POSITION_AND_LOOK: i32 = 0x2F;
    pub const DESTROY_ENTITIES: i32 = 0x32;
    pub const RESPAWN: i32 = 0x35;
    pub const UPDATE_HEALTH: i32 = 0x41;
    pub const SPAWN_POSITION: i32 = 0x46;
    pub const TIME_UPDATE: i32 = 0x47;
    pub const ENTITY_TELEPORT: i32 = 0x4C;
}
