//! Error types for the room layer.
//!
//! Every variant is a validation failure: it is reported to the client
//! that caused it (as an `error` event) and never ends a room. The
//! `Display` text is what that client sees.

use huddle_protocol::{PlayerId, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No room is registered under this code (as the client typed it).
    #[error("Room {0} not found")]
    RoomNotFound(String),

    /// The room has left the lobby; joins are closed.
    #[error("Game already started")]
    GameAlreadyStarted,

    /// Another player in the room already uses this name.
    #[error("Name \"{0}\" is already taken")]
    NameTaken(String),

    /// Blank or overlong player name.
    #[error("Name must be between 1 and {max} characters")]
    InvalidName { max: usize },

    /// The lobby holds the game's maximum number of players.
    #[error("Room is full ({max} players)")]
    RoomFull { max: usize },

    /// Only the host may start the game.
    #[error("Only the host can start the game")]
    NotHost,

    /// Fewer connected players than the game's minimum.
    #[error("Need at least {min} players to start (have {actual})")]
    NotEnoughPlayers { min: usize, actual: usize },

    /// More connected players than the game's maximum.
    #[error("At most {max} players can play (have {actual})")]
    TooManyPlayers { max: usize, actual: usize },

    /// The player is already in a room; one room at a time.
    #[error("player {0} is already in a room")]
    AlreadyInRoom(PlayerId),

    /// The player is not in this room (or in any room).
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// Game input arrived before the game was started.
    #[error("Game has not started")]
    GameNotStarted,

    /// The game failed while being dealt.
    #[error("Game could not be started: {0}")]
    GameFault(String),

    /// The room's actor is gone (expired, or its channel is closed).
    #[error("Room {0} is unavailable")]
    Unavailable(RoomCode),
}
