//! Headless Minecraft 1.12.2 client.
//!
//! [`session::Session`] wires the pieces together: a [`net::Connection`]
//! moves frames, the [`dispatch::DispatchTable`] built by
//! [`handlers::standard`] interprets them against the shared
//! [`game::GameState`], and the [`movement::Movement`] coordinator walks the
//! player between targets.

pub mod chat;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod game;
pub mod handlers;
pub mod login;
pub mod movement;
pub mod net;
pub mod session;

pub use config::ClientConfig;
pub use error::ClientError;
pub use session::Session;
