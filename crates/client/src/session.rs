//! One client session, start to finish.
//!
//! connect -> start socket tasks -> login -> movement -> play loop -> teardown
//!
//! Teardown always runs, whatever ended the session.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use ultimate_protocol::packets::ConnectionState;

use crate::config::ClientConfig;
use crate::dispatch::{DispatchTable, HandlerContext};
use crate::error::{ClientError, Result};
use crate::game::GameState;
use crate::handlers;
use crate::login::{self, LoginContext};
use crate::movement::Movement;
use crate::net::queue::InboundSender;
use crate::net::{Connection, Inbound, Outbound, queue};

pub struct Session {
    config: ClientConfig,
    table: DispatchTable,
    game: Arc<GameState>,
    connection: Connection,
    movement: watch::Sender<Option<Movement>>,
}

impl Session {
    pub fn new(config: ClientConfig) -> Self {
        let connection = Connection::new()
            .with_start_timeout(config.timeouts.start())
            .with_join_timeout(config.timeouts.join());
        Self {
            config,
            table: handlers::standard(),
            game: Arc::new(GameState::new()),
            connection,
            movement: watch::channel(None).0,
        }
    }

    pub fn game(&self) -> &Arc<GameState> {
        &self.game
    }

    /// Available once play has started.
    pub fn movement(&self) -> Option<Movement> {
        self.movement.borrow().clone()
    }

    /// Follow the movement handle from outside while `run` holds the session.
    pub fn watch_movement(&self) -> watch::Receiver<Option<Movement>> {
        self.movement.subscribe()
    }

    /// Run the session to completion. `Ok` only if it ended without error,
    /// which in practice never happens: servers end sessions by kicking.
    pub async fn run(&mut self) -> Result<()> {
        if let Err(e) = self.config.validate() {
            let err = ClientError::InvalidConfig(format!("{:#}", e));
            tracing::error!("Session not started: {}", err);
            return Err(err);
        }

        let (outbound, outbound_rx) = queue::outbound();
        let (inbound_tx, mut inbound) = queue::inbound();

        let result = self.drive(&outbound, outbound_rx, inbound_tx, &mut inbound).await;

        // ── Teardown ──
        outbound.close();
        if let Some(movement) = self.movement() {
            movement.shutdown();
        }
        self.connection.close().await;

        match &result {
            Ok(()) => tracing::info!("Session ended"),
            Err(e) => tracing::error!("Session ended: {}", e),
        }
        result
    }

    async fn drive(
        &mut self,
        outbound: &Outbound,
        outbound_rx: tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>,
        inbound_tx: InboundSender,
        inbound: &mut Inbound,
    ) -> Result<()> {
        let address = self.config.address();
        self.connection
            .connect(&address, self.config.timeouts.connect())
            .await?;
        self.connection.start_listener(inbound_tx).await?;
        self.connection.start_sender(outbound_rx).await?;

        login::login(&mut LoginContext {
            connection: &self.connection,
            inbound: &mut *inbound,
            outbound,
            table: &self.table,
            game: &self.game,
            host: &self.config.host,
            port: self.config.port,
            username: &self.config.username,
            protocol_version: self.config.protocol_version,
            read_timeout: self.config.timeouts.login_read(),
        })
        .await?;

        let (movement, handle) = Movement::spawn(
            self.config.movement.clone(),
            self.config.timeouts.position(),
            Arc::clone(&self.game),
            outbound.clone(),
        );
        for &[x, y, z] in &self.config.waypoints {
            movement.add_target(x, y, z);
        }
        self.movement.send_replace(Some(movement.clone()));

        self.play(outbound, inbound, &movement, handle).await
    }

    async fn play(
        &self,
        outbound: &Outbound,
        inbound: &mut Inbound,
        movement: &Movement,
        handle: JoinHandle<Result<()>>,
    ) -> Result<()> {
        let ctx = HandlerContext::new(&self.game, outbound).with_movement(movement);
        let read_timeout = self.config.timeouts.play_read();
        let mut handle = Some(handle);

        loop {
            tokio::select! {
                payload = inbound.recv(read_timeout) => {
                    self.table.interpret(ConnectionState::Play, &payload?, &ctx)?;
                }
                joined = async {
                    match handle.as_mut() {
                        Some(h) => h.await,
                        None => std::future::pending().await,
                    }
                }, if handle.is_some() => {
                    handle = None;
                    match joined {
                        Ok(Ok(())) => tracing::info!("Movement finished; staying connected"),
                        Ok(Err(e)) => return Err(e),
                        Err(_) => return Err(ClientError::MovementStopped),
                    }
                }
            }
        }
    }
}

/// Run one session with `config`. Returns `None` if it ended without an
/// error, otherwise the reason it ended.
pub async fn run(config: ClientConfig) -> Option<String> {
    let mut session = Session::new(config);
    session.run().await.err().map(|e| e.reason())
}
