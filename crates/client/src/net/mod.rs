pub mod connection;
pub mod queue;

pub use connection::{Connection, LinkState};
pub use queue::{Inbound, Outbound};
