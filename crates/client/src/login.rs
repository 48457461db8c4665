//! Login sequencer: handshake, login start, then drive login-state packets
//! through the dispatch table until the server lets us into play.

use std::time::Duration;

use ultimate_protocol::packets::{ConnectionState, serverbound};

use crate::dispatch::{Action, DispatchTable, HandlerContext};
use crate::error::{ClientError, Result};
use crate::game::GameState;
use crate::net::{Connection, Inbound, Outbound};

/// A well-behaved server finishes login in at most this many packets
/// (encryption request, set compression, login success, plus slack).
pub const LOGIN_PACKET_LIMIT: usize = 5;

pub struct LoginContext<'a> {
    pub connection: &'a Connection,
    pub inbound: &'a mut Inbound,
    pub outbound: &'a Outbound,
    pub table: &'a DispatchTable,
    pub game: &'a GameState,
    pub host: &'a str,
    pub port: u16,
    pub username: &'a str,
    pub protocol_version: i32,
    /// Wait for each login packet.
    pub read_timeout: Duration,
}

pub async fn login(ctx: &mut LoginContext<'_>) -> Result<()> {
    let conn = ctx.connection;
    conn.set_lockstep(true);
    let result = exchange(ctx).await;
    conn.set_lockstep(false);
    result
}

async fn exchange(ctx: &mut LoginContext<'_>) -> Result<()> {
    ctx.outbound.send(serverbound::handshake(
        ctx.protocol_version,
        ctx.host,
        ctx.port,
        ConnectionState::Login,
    ));
    ctx.outbound.send(serverbound::login_start(ctx.username));
    tracing::info!("Logging in as {}", ctx.username);

    let handlers = HandlerContext::new(ctx.game, ctx.outbound);
    for _ in 0..LOGIN_PACKET_LIMIT {
        let payload = ctx.inbound.recv(ctx.read_timeout).await?;
        let action = ctx
            .table
            .interpret(ConnectionState::Login, &payload, &handlers)?
            .action();

        match action {
            Action::LoginComplete => {
                ctx.connection.set_lockstep(false);
                ctx.connection.ack_frame();
                return Ok(());
            }
            Action::SetCompression(threshold) => ctx.connection.set_compression_threshold(threshold),
            Action::None => {}
        }
        ctx.connection.ack_frame();
    }

    Err(ClientError::LoginTimeout(LOGIN_PACKET_LIMIT))
}
