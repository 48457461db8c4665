//! Everything the client knows about the world, shared between the dispatch
//! loop (writer) and the movement coordinator (reader and writer).
//!
//! Uses `std::sync::Mutex` for the small records because every access is
//! brief and never held across an await. The player position is a `watch`
//! cell so the movement coordinator can wait for the first server update.

pub mod entity;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use ultimate_protocol::position::BlockPos;

use crate::error::{ClientError, Result};
use entity::Entity;

/// Chat lines kept in memory.
pub const CHAT_LOG_CAPACITY: usize = 100;

/// The local player's position and look.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerPosition {
    pub x: f64,
    /// Feet height.
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

/// Position cell. `None` until the server's first Player Position And Look.
#[derive(Debug)]
pub struct SharedPosition {
    cell: watch::Sender<Option<PlayerPosition>>,
}

impl SharedPosition {
    pub fn new() -> Self {
        let (cell, _) = watch::channel(None);
        Self { cell }
    }

    pub fn get(&self) -> Option<PlayerPosition> {
        *self.cell.borrow()
    }

    pub fn set(&self, position: PlayerPosition) {
        self.cell.send_replace(Some(position));
    }

    /// Atomic read-modify-write; `f` only runs if the position is known.
    /// Returns the updated position.
    pub fn update<F>(&self, f: F) -> Option<PlayerPosition>
    where
        F: FnOnce(&mut PlayerPosition),
    {
        let mut updated = None;
        self.cell.send_if_modified(|cell| match cell {
            Some(pos) => {
                f(pos);
                updated = Some(*pos);
                true
            }
            None => false,
        });
        updated
    }

    /// Replace the position with `f(current)`, known or not, in one step.
    pub fn replace_with<F>(&self, f: F) -> PlayerPosition
    where
        F: FnOnce(Option<PlayerPosition>) -> PlayerPosition,
    {
        let mut next = PlayerPosition::default();
        self.cell.send_modify(|cell| {
            next = f(*cell);
            *cell = Some(next);
        });
        next
    }

    /// Wait until the server has told us where we are.
    pub async fn wait_known(&self, timeout: Option<Duration>) -> Result<PlayerPosition> {
        let mut rx = self.cell.subscribe();
        let wait = async {
            match rx.wait_for(Option::is_some).await {
                Ok(pos) => *pos,
                // The sender lives in `self`, so it cannot be gone.
                Err(_) => None,
            }
        };
        let known = match timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| ClientError::PositionTimeout(limit))?,
            None => wait.await,
        };
        known.ok_or(ClientError::MovementStopped)
    }
}

impl Default for SharedPosition {
    fn default() -> Self {
        Self::new()
    }
}

/// Who we are and how we are doing.
#[derive(Debug, Clone, Default)]
pub struct PlayerInfo {
    pub uuid: Option<String>,
    pub username: Option<String>,
    pub entity_id: Option<i32>,
    pub gamemode: u8,
    pub hardcore: bool,
    pub dimension: i32,
    pub health: f32,
    pub food: i32,
    pub saturation: f32,
}

#[derive(Debug, Clone, Default)]
pub struct WorldInfo {
    pub difficulty: u8,
    pub level_type: String,
    pub max_players: u8,
    pub world_age: i64,
    pub time_of_day: i64,
    pub spawn: Option<BlockPos>,
    pub raining: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatLine {
    pub position: i8,
    pub text: String,
}

/// Shared game state handed to every packet handler.
#[derive(Debug, Default)]
pub struct GameState {
    position: SharedPosition,
    player: Mutex<PlayerInfo>,
    world: Mutex<WorldInfo>,
    chat: Mutex<VecDeque<ChatLine>>,
    entities: DashMap<i32, Entity>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> &SharedPosition {
        &self.position
    }

    pub fn player(&self) -> PlayerInfo {
        self.player.lock().expect("player info poisoned").clone()
    }

    pub fn update_player<R>(&self, f: impl FnOnce(&mut PlayerInfo) -> R) -> R {
        f(&mut self.player.lock().expect("player info poisoned"))
    }

    pub fn world(&self) -> WorldInfo {
        self.world.lock().expect("world info poisoned").clone()
    }

    pub fn update_world<R>(&self, f: impl FnOnce(&mut WorldInfo) -> R) -> R {
        f(&mut self.world.lock().expect("world info poisoned"))
    }

    /// Append a chat line, dropping the oldest once the log is full.
    pub fn push_chat(&self, line: ChatLine) {
        let mut chat = self.chat.lock().expect("chat log poisoned");
        if chat.len() == CHAT_LOG_CAPACITY {
            chat.pop_front();
        }
        chat.push_back(line);
    }

    pub fn chat_log(&self) -> Vec<ChatLine> {
        self.chat.lock().expect("chat log poisoned").iter().cloned().collect()
    }

    pub fn entities(&self) -> &DashMap<i32, Entity> {
        &self.entities
    }

    pub fn entity(&self, entity_id: i32) -> Option<Entity> {
        self.entities.get(&entity_id).map(|e| e.clone())
    }
}
