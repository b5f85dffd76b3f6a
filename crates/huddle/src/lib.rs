//! # Huddle
//!
//! A room-based party game server.
//!
//! Players create or join a room by its six-character code, the host
//! starts one of the hosted games, and the room's actor runs that game's
//! phase machine until it ends. This crate is the outer shell: it accepts
//! WebSocket connections, decodes [`ClientEvent`]s, routes them through
//! the [`RoomRegistry`] and writes each player's [`ServerEvent`]s back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use huddle::prelude::*;
//!
//! # async fn run<G: GameLogic>() -> Result<(), HuddleError> {
//! let server = HuddleServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build::<G>()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! [`ClientEvent`]: huddle_protocol::ClientEvent
//! [`ServerEvent`]: huddle_protocol::ServerEvent
//! [`RoomRegistry`]: huddle_room::RoomRegistry

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::HuddleError;
pub use server::{HuddleServer, HuddleServerBuilder};

pub mod prelude {
    pub use crate::{HuddleError, HuddleServer, HuddleServerBuilder, ServerConfig};
    pub use huddle_protocol::{ClientEvent, GameKind, PlayerId, RoomCode, ServerEvent};
    pub use huddle_room::{GameLogic, RoomConfig};
}
