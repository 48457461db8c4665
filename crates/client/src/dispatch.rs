//! Packet dispatch: (connection state, packet id) -> handler.
//!
//! The table is built once at startup (see `handlers::standard()`) and is
//! read-only afterwards. Unknown ids are skipped, not errors.

use std::collections::HashMap;

use ultimate_protocol::buf::PacketReader;
use ultimate_protocol::packets::ConnectionState;

use crate::error::Result;
use crate::game::GameState;
use crate::movement::Movement;
use crate::net::Outbound;

/// What the sequencer should do after a handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// Login finished; switch to play.
    LoginComplete,
    /// Apply a new compression threshold to both directions.
    SetCompression(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// No handler for this id in this state; the payload was dropped.
    Unhandled { id: i32 },
    Handled { id: i32, action: Action },
}

impl Dispatch {
    pub fn action(&self) -> Action {
        match self {
            Dispatch::Unhandled { .. } => Action::None,
            Dispatch::Handled { action, .. } => *action,
        }
    }
}

/// Everything a handler may touch.
pub struct HandlerContext<'a> {
    pub game: &'a GameState,
    pub outbound: &'a Outbound,
    /// Absent during login.
    pub movement: Option<&'a Movement>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(game: &'a GameState, outbound: &'a Outbound) -> Self {
        Self {
            game,
            outbound,
            movement: None,
        }
    }

    pub fn with_movement(mut self, movement: &'a Movement) -> Self {
        self.movement = Some(movement);
        self
    }

    /// Queue a serverbound payload.
    pub fn send(&self, payload: Vec<u8>) {
        self.outbound.send(payload);
    }
}

/// A packet handler. The reader is positioned just after the packet id.
pub trait PacketHandler: Send + Sync {
    fn handle(&self, reader: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action>;
}

impl<F> PacketHandler for F
where
    F: Fn(&mut PacketReader<'_>, &HandlerContext<'_>) -> Result<Action> + Send + Sync,
{
    fn handle(&self, reader: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
        self(reader, ctx)
    }
}

#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<(ConnectionState, i32), Box<dyn PacketHandler>>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `id` in `state`, replacing any previous one.
    pub fn register<F>(&mut self, state: ConnectionState, id: i32, handler: F)
    where
        F: Fn(&mut PacketReader<'_>, &HandlerContext<'_>) -> Result<Action> + Send + Sync + 'static,
    {
        self.register_handler(state, id, handler);
    }

    pub fn register_handler<H>(&mut self, state: ConnectionState, id: i32, handler: H)
    where
        H: PacketHandler + 'static,
    {
        self.handlers.insert((state, id), Box::new(handler));
    }

    pub fn contains(&self, state: ConnectionState, id: i32) -> bool {
        self.handlers.contains_key(&(state, id))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Decode the packet id and run the matching handler.
    pub fn interpret(
        &self,
        state: ConnectionState,
        payload: &[u8],
        ctx: &HandlerContext<'_>,
    ) -> Result<Dispatch> {
        let mut reader = PacketReader::new(payload);
        let id = reader.varint()?;

        let Some(handler) = self.handlers.get(&(state, id)) else {
            tracing::trace!("No {} handler for packet 0x{:02X}, skipping", state, id);
            return Ok(Dispatch::Unhandled { id });
        };

        match handler.handle(&mut reader, ctx) {
            Ok(action) => Ok(Dispatch::Handled { id, action }),
            Err(e) => {
                tracing::error!("{} handler for packet 0x{:02X} failed: {}", state, id, e);
                Err(e)
            }
        }
    }
}
