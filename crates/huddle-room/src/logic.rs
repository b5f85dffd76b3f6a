//! The `GameLogic` trait: the phase engine contract every game implements.
//!
//! The room actor owns one `GameLogic` value per running game and calls
//! into it from its serialized command loop. Game code never touches
//! sockets or clocks: it returns [`Effects`] (events to deliver, timers to
//! arm or disarm) and the room carries them out.

use std::time::Duration;

use huddle_protocol::{GameKind, PlayerId, Recipient};
use rand::rngs::StdRng;
use serde::{Serialize, de::DeserializeOwned};

use crate::PlayerLimits;
use crate::phase::NotEligible;

/// A seated player, as the game sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub id: PlayerId,
    pub name: String,
    /// Hosted the room when the game was dealt.
    pub is_host: bool,
}

impl Seat {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_host: false,
        }
    }

    /// Marks this seat as the host's.
    pub fn with_host(mut self, is_host: bool) -> Self {
        self.is_host = is_host;
        self
    }
}

/// Input the game refused. Sent back to the sender as an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ActionError(pub String);

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<NotEligible> for ActionError {
    fn from(_: NotEligible) -> Self {
        Self::new("You are not part of this round")
    }
}

/// A timer request from the game.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerOp<T> {
    /// Fire `timer` after `after`; re-arms if already pending.
    Schedule { timer: T, after: Duration },
    /// Disarm `timer`.
    Cancel(T),
    /// Disarm every game timer.
    CancelAll,
}

/// What a game handler wants the room to do.
#[derive(Debug)]
pub struct Effects<E, T> {
    messages: Vec<(Recipient, E)>,
    timers: Vec<TimerOp<T>>,
}

impl<E, T> Default for Effects<E, T> {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            timers: Vec::new(),
        }
    }
}

impl<E, T> Effects<E, T> {
    /// Nothing to do. Also what a handler returns for stale input.
    pub fn none() -> Self {
        Self::default()
    }

    /// Sends `event` to everyone in the room.
    pub fn broadcast(&mut self, event: E) -> &mut Self {
        self.messages.push((Recipient::All, event));
        self
    }

    /// Sends `event` to one player only.
    pub fn send_to(&mut self, player: PlayerId, event: E) -> &mut Self {
        self.messages.push((Recipient::Player(player), event));
        self
    }

    /// Sends `event` to everyone but `player`.
    pub fn send_except(&mut self, player: PlayerId, event: E) -> &mut Self {
        self.messages.push((Recipient::AllExcept(player), event));
        self
    }

    /// Arms `timer` to fire after `after`.
    pub fn schedule(&mut self, timer: T, after: Duration) -> &mut Self {
        self.timers.push(TimerOp::Schedule { timer, after });
        self
    }

    /// Disarms `timer`.
    pub fn cancel(&mut self, timer: T) -> &mut Self {
        self.timers.push(TimerOp::Cancel(timer));
        self
    }

    /// Disarms every game timer.
    pub fn cancel_all_timers(&mut self) -> &mut Self {
        self.timers.push(TimerOp::CancelAll);
        self
    }

    /// Appends `other` after the effects already queued.
    pub fn append(&mut self, other: Effects<E, T>) -> &mut Self {
        self.messages.extend(other.messages);
        self.timers.extend(other.timers);
        self
    }

    /// Queued messages.
    pub fn messages(&self) -> &[(Recipient, E)] {
        &self.messages
    }

    /// Queued timer operations.
    pub fn timers(&self) -> &[TimerOp<T>] {
        &self.timers
    }

    /// Returns `true` if there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.timers.is_empty()
    }

    /// Splits into messages and timer operations.
    pub fn into_parts(self) -> (Vec<(Recipient, E)>, Vec<TimerOp<T>>) {
        (self.messages, self.timers)
    }

    /// Converts event and timer types, e.g. to wrap one game's effects in
    /// a union of all games.
    pub fn map<E2, T2>(
        self,
        event: impl Fn(E) -> E2,
        timer: impl Fn(T) -> T2,
    ) -> Effects<E2, T2> {
        Effects {
            messages: self
                .messages
                .into_iter()
                .map(|(to, e)| (to, event(e)))
                .collect(),
            timers: self
                .timers
                .into_iter()
                .map(|op| match op {
                    TimerOp::Schedule { timer: t, after } => TimerOp::Schedule {
                        timer: timer(t),
                        after,
                    },
                    TimerOp::Cancel(t) => TimerOp::Cancel(timer(t)),
                    TimerOp::CancelAll => TimerOp::CancelAll,
                })
                .collect(),
        }
    }
}

/// Result type of an input handler.
pub type ActionResult<E, T> = Result<Effects<E, T>, ActionError>;

/// The core trait every game (or union of games) implements.
///
/// Associated types:
/// - `Action`: what clients send during the game
/// - `Event`: what the game sends to clients
/// - `Timer`: keys for deferred re-entries (round deadlines, next-round
///   pauses); they come back through [`on_timer`](Self::on_timer)
///
/// Randomness is injected: the room owns an `StdRng` and lends it to
/// `start` and the handlers, so tests can seed it. Resolvers called from
/// the handlers must not use it.
pub trait GameLogic: Sized + Send + 'static {
    type Action: Send + std::fmt::Debug + Serialize + DeserializeOwned + 'static;
    type Event: Send + Clone + std::fmt::Debug + Serialize + DeserializeOwned + 'static;
    type Timer: Send + Clone + PartialEq + std::fmt::Debug + 'static;

    /// Seated player bounds for `kind`.
    fn limits(kind: GameKind) -> PlayerLimits;

    /// Deals a new game for `seats` (already checked against `limits`).
    fn start(
        kind: GameKind,
        seats: &[Seat],
        rng: &mut StdRng,
    ) -> (Self, Effects<Self::Event, Self::Timer>);

    /// Processes one input from `sender`.
    ///
    /// Input for a phase other than the current one must return
    /// `Ok(Effects::none())`: stale input is dropped, not an error.
    fn handle_action(
        &mut self,
        sender: PlayerId,
        action: Self::Action,
        rng: &mut StdRng,
    ) -> ActionResult<Self::Event, Self::Timer>;

    /// A timer armed through [`Effects::schedule`] fired.
    fn on_timer(
        &mut self,
        timer: Self::Timer,
        rng: &mut StdRng,
    ) -> Effects<Self::Event, Self::Timer>;

    /// Returns `true` once the game is over. Checked after every handler.
    fn is_finished(&self) -> bool;

    /// A seated player disconnected. Their submission slots stay open.
    /// Default: no-op.
    fn on_player_disconnect(&mut self, _player: PlayerId) -> Effects<Self::Event, Self::Timer> {
        Effects::none()
    }
}
