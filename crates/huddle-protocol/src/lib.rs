//! Wire protocol for Huddle.
//!
//! This crate defines the "language" that browser clients and the server
//! speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`RoomSnapshot`], ...):
//!   the events that travel on the wire, plus the identity types
//!   ([`PlayerId`], [`RoomCode`]) and the game catalogue ([`GameKind`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events are turned
//!   into frame bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (events) → Room (game state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientEvent, GameKind, PlayerId, PlayerSummary, Recipient, RoomCode,
    RoomSnapshot, RoomState, ServerEvent,
};
