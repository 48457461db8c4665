//! Login-state handlers.

use ultimate_protocol::buf::PacketReader;
use ultimate_protocol::packets::clientbound::{
    Decode, Disconnect, EncryptionRequest, LoginSuccess, SetCompression,
};

use crate::chat;
use crate::dispatch::{Action, HandlerContext};
use crate::error::{ClientError, Result};

pub fn disconnect(r: &mut PacketReader<'_>, _ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = Disconnect::decode(r)?;
    Err(ClientError::ServerDisconnect(chat::plain_text(&packet.reason)))
}

/// Online-mode servers want an encrypted, authenticated session. We only
/// speak offline mode.
pub fn encryption_request(r: &mut PacketReader<'_>, _ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = EncryptionRequest::decode(r)?;
    tracing::warn!("Server requested encryption (server id '{}')", packet.server_id);
    Err(ClientError::Unsupported("online-mode encryption"))
}

pub fn login_success(r: &mut PacketReader<'_>, ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = LoginSuccess::decode(r)?;
    tracing::info!("Logged in as {} ({})", packet.username, packet.uuid);
    ctx.game.update_player(|p| {
        p.uuid = Some(packet.uuid);
        p.username = Some(packet.username);
    });
    Ok(Action::LoginComplete)
}

pub fn set_compression(r: &mut PacketReader<'_>, _ctx: &HandlerContext<'_>) -> Result<Action> {
    let packet = SetCompression::decode(r)?;
    tracing::debug!("Server enabled compression (threshold {})", packet.threshold);
    Ok(Action::SetCompression(packet.threshold))
}
