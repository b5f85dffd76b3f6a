//! Core protocol types for Huddle's wire format.
//!
//! Every type here travels on the wire: it is serialized to JSON, sent over
//! the WebSocket, and deserialized by the browser client (or by the server,
//! for inbound events).
//!
//! Events are "adjacently tagged": the event name sits in `event`, its
//! fields in `data`:
//!
//! ```json
//! {"event":"join-room","data":{"room_code":"ABC234","player_name":"Bo"}}
//! ```

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// The server derives it from the connection, so a player's identity is
/// "this socket". Serialized as a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The six-character code players type to find a room.
///
/// Codes are drawn from an alphabet without look-alike characters
/// (no `0/O`, no `1/I`). Parsing upper-cases the input, so `abc234`
/// and `ABC234` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Characters a room code may contain.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    /// Length of every room code.
    pub const LEN: usize = 6;

    /// Draws a random code. Uniqueness is the registry's job.
    pub fn random(rng: &mut impl Rng) -> Self {
        let code = (0..Self::LEN)
            .map(|_| {
                let idx = rng.random_range(0..Self::ALPHABET.len());
                char::from(Self::ALPHABET[idx])
            })
            .collect();
        Self(code)
    }

    /// Validates and normalizes user input into a code.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == Self::LEN
            && code.bytes().all(|b| Self::ALPHABET.contains(&b));
        if valid {
            Ok(Self(code))
        } else {
            Err(ProtocolError::InvalidRoomCode(input.to_string()))
        }
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

// ---------------------------------------------------------------------------
// Game catalogue
// ---------------------------------------------------------------------------

/// Every game a room can be created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    Avalon,
    Imposter,
    Insider,
    Wavelength,
    Npat,
    Punchline,
    BrokenPictionary,
    DoodleDuel,
    TwoTruths,
    Fishbowl,
    TriviaRoyale,
    ThisOrThat,
    HotTakes,
    NeverEver,
    BetOrBluff,
}

impl GameKind {
    /// All game kinds, in catalogue order.
    pub const ALL: [GameKind; 15] = [
        Self::Avalon,
        Self::Imposter,
        Self::Insider,
        Self::Wavelength,
        Self::Npat,
        Self::Punchline,
        Self::BrokenPictionary,
        Self::DoodleDuel,
        Self::TwoTruths,
        Self::Fishbowl,
        Self::TriviaRoyale,
        Self::ThisOrThat,
        Self::HotTakes,
        Self::NeverEver,
        Self::BetOrBluff,
    ];

    /// The wire name (`"broken-pictionary"`, `"hot-takes"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Avalon => "avalon",
            Self::Imposter => "imposter",
            Self::Insider => "insider",
            Self::Wavelength => "wavelength",
            Self::Npat => "npat",
            Self::Punchline => "punchline",
            Self::BrokenPictionary => "broken-pictionary",
            Self::DoodleDuel => "doodle-duel",
            Self::TwoTruths => "two-truths",
            Self::Fishbowl => "fishbowl",
            Self::TriviaRoyale => "trivia-royale",
            Self::ThisOrThat => "this-or-that",
            Self::HotTakes => "hot-takes",
            Self::NeverEver => "never-ever",
            Self::BetOrBluff => "bet-or-bluff",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownGame(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive a message?
// ---------------------------------------------------------------------------

/// Specifies who should receive a server event.
///
/// Game logic returns `(Recipient, Event)` pairs; the room delivers each
/// one over its topic. Private information (a role, a secret word, the
/// psychic's target) goes to `Player`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every player in the room.
    All,
    /// One specific player.
    Player(PlayerId),
    /// Everyone except the given player.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Room lifecycle
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Lobby ──start──→ Playing ──game over──→ Ended
///                     ↑                     │
///                     └──────rematch────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    Lobby,
    Playing,
    Ended,
}

impl RoomState {
    /// Only a lobby accepts new players.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` if a game can be started from this state.
    pub fn can_start(self) -> bool {
        self.can_transition_to(Self::Playing)
    }

    /// The room state transition table.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Lobby, Self::Playing)
                | (Self::Playing, Self::Ended)
                | (Self::Ended, Self::Playing)
        )
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "lobby"),
            Self::Playing => write!(f, "playing"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// A player as shown to the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub connected: bool,
    pub is_host: bool,
}

/// A snapshot of room metadata, broadcast on every lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub game: GameKind,
    pub state: RoomState,
    pub host: PlayerId,
    pub players: Vec<PlayerSummary>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Client → server events.
///
/// `A` is the game action type; the framework passes it through to the
/// room's game logic untouched. A connection belongs to at most one room,
/// so game actions don't repeat the room code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent<A> {
    /// Open a new room and become its host.
    CreateRoom { player_name: String, game: GameKind },
    /// Join an existing room's lobby. The code is taken as typed; the
    /// server parses it so a malformed code reads as an unknown room.
    JoinRoom { room_code: String, player_name: String },
    /// Host only: deal the game.
    StartGame,
    /// Leave the current room (treated like a disconnect).
    LeaveRoom,
    /// Keep-alive; the server echoes `client_time` back.
    Heartbeat { client_time: u64 },
    /// In-game input for the room's active game.
    Game(A),
}

/// Server → client events.
///
/// `E` is the game event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent<E> {
    /// The sender's room was created; they are its host.
    RoomCreated { room_code: RoomCode, player_id: PlayerId },
    /// The sender joined a room.
    RoomJoined { room_code: RoomCode, player_id: PlayerId },
    /// Membership or lifecycle changed.
    RoomUpdate(RoomSnapshot),
    /// A game was dealt.
    GameStarted { game: GameKind },
    /// Game-specific event.
    Game(E),
    /// The game was stopped by the server (a fault inside the room).
    GameAborted { reason: String },
    /// Answer to a heartbeat.
    HeartbeatAck { client_time: u64, server_time: u64 },
    /// A request from this client was rejected.
    Error { message: String },
}
