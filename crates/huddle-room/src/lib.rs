//! Rooms and the phase engine for Huddle.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! membership, its game, its timers and its RNG.
//!
//! # Key types
//!
//! - [`GameLogic`]: the trait games implement
//! - [`Effects`]: what a game handler asks the room to do
//! - [`PhaseMachine`] and [`Submissions`]: the "collect, then resolve
//!   once" building blocks
//! - [`RoomRegistry`]: creates rooms and routes players to them
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomConfig`] and [`PlayerLimits`]: room settings

mod actor;
mod config;
mod error;
mod logic;
pub mod phase;
mod registry;
mod room;

pub use actor::{PlayerSender, RoomHandle};
pub use config::{PlayerLimits, RoomConfig};
pub use error::RoomError;
pub use logic::{ActionError, ActionResult, Effects, GameLogic, Seat, TimerOp};
pub use phase::{NotEligible, Phase, PhaseError, PhaseMachine, Submissions, Submitted};
pub use registry::RoomRegistry;
pub use room::{Departure, MAX_NAME_LEN, Player, Room, normalize_name};
