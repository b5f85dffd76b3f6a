//! Building blocks for "collect from everyone, then resolve once".
//!
//! Every game round has the same skeleton:
//!
//! 1. enter a phase and tell players what is expected,
//! 2. collect one submission per eligible player ([`Submissions`]),
//! 3. when the map is complete, or a timer expires, resolve,
//! 4. announce results and move on.
//!
//! Step 3 can be reached twice for the same phase: the last submission and
//! the phase timer may both arrive before either is handled. The guard is
//! [`PhaseMachine::advance`]: resolution starts by moving out of the phase
//! it resolves, so the second attempt finds the machine elsewhere and gets
//! [`PhaseError::Stale`]. Games treat that as "already done" and return
//! without effects.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use huddle_protocol::PlayerId;

// ---------------------------------------------------------------------------
// Phase transition tables
// ---------------------------------------------------------------------------

/// A game's phase enum plus its transition table.
pub trait Phase: Copy + Eq + fmt::Debug {
    /// Returns `true` if the game may move from `self` to `next`.
    fn allows(self, next: Self) -> bool;
}

/// Why a phase transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError<P: fmt::Debug> {
    /// The machine is not in the phase the caller meant to leave.
    /// Usually a duplicate resolution or stale input.
    #[error("expected phase {expected:?}, current phase is {actual:?}")]
    Stale { expected: P, actual: P },

    /// The transition table forbids this move.
    #[error("illegal phase transition {from:?} -> {to:?}")]
    Illegal { from: P, to: P },
}

/// Holds the current phase and only moves along the table.
#[derive(Debug, Clone)]
pub struct PhaseMachine<P> {
    current: P,
    transitions: u32,
}

impl<P: Phase> PhaseMachine<P> {
    /// Starts in `initial`.
    pub fn new(initial: P) -> Self {
        Self {
            current: initial,
            transitions: 0,
        }
    }

    /// The current phase.
    pub fn current(&self) -> P {
        self.current
    }

    /// Returns `true` if the machine is in `phase`.
    pub fn is(&self, phase: P) -> bool {
        self.current == phase
    }

    /// How many transitions have happened.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Moves from `from` to `to`.
    ///
    /// Fails with [`PhaseError::Stale`] unless the machine is currently in
    /// `from`, and with [`PhaseError::Illegal`] if the table has no such
    /// edge. On failure nothing changes.
    pub fn advance(&mut self, from: P, to: P) -> Result<(), PhaseError<P>> {
        if self.current != from {
            return Err(PhaseError::Stale {
                expected: from,
                actual: self.current,
            });
        }
        if !from.allows(to) {
            return Err(PhaseError::Illegal { from, to });
        }
        self.current = to;
        self.transitions += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Submission maps
// ---------------------------------------------------------------------------

/// Outcome of a successful [`Submissions::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// The player's first submission this phase.
    First,
    /// The player resubmitted; the old value was overwritten.
    Replaced,
}

/// A submission from someone the phase isn't waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("player {0} is not expected to submit in this phase")]
pub struct NotEligible(pub PlayerId);

/// One value per eligible player, keyed by player id.
///
/// The expected cardinality is the size of the eligible set: everyone for
/// a vote, everyone but the psychic for a guess, just the team for a
/// quest. Disconnected players keep their slot. Iteration is in player id
/// order so resolvers see a deterministic sequence.
#[derive(Debug, Clone)]
pub struct Submissions<V> {
    entries: BTreeMap<PlayerId, V>,
    eligible: BTreeSet<PlayerId>,
}

impl<V> Default for Submissions<V> {
    /// Expects nothing; complete from the start.
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            eligible: BTreeSet::new(),
        }
    }
}

impl<V> Submissions<V> {
    /// Expects one submission from each of `eligible`.
    pub fn new(eligible: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            entries: BTreeMap::new(),
            eligible: eligible.into_iter().collect(),
        }
    }

    /// Records `value` for `player`, overwriting any earlier value.
    pub fn submit(&mut self, player: PlayerId, value: V) -> Result<Submitted, NotEligible> {
        if !self.eligible.contains(&player) {
            return Err(NotEligible(player));
        }
        match self.entries.insert(player, value) {
            None => Ok(Submitted::First),
            Some(_) => Ok(Submitted::Replaced),
        }
    }

    /// Returns `true` once every eligible player has submitted.
    pub fn is_complete(&self) -> bool {
        self.entries.len() == self.eligible.len()
    }

    /// Expected cardinality.
    pub fn expected(&self) -> usize {
        self.eligible.len()
    }

    /// Submissions so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nobody has submitted yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `player` may submit.
    pub fn is_eligible(&self, player: PlayerId) -> bool {
        self.eligible.contains(&player)
    }

    /// Returns `true` if `player` has submitted.
    pub fn contains(&self, player: PlayerId) -> bool {
        self.entries.contains_key(&player)
    }

    /// The value `player` submitted.
    pub fn get(&self, player: PlayerId) -> Option<&V> {
        self.entries.get(&player)
    }

    /// Eligible players who haven't submitted.
    pub fn missing(&self) -> Vec<PlayerId> {
        self.eligible
            .iter()
            .filter(|p| !self.entries.contains_key(p))
            .copied()
            .collect()
    }

    /// Iterates submissions in player id order.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &V)> {
        self.entries.iter().map(|(p, v)| (*p, v))
    }

    /// The raw map.
    pub fn entries(&self) -> &BTreeMap<PlayerId, V> {
        &self.entries
    }
}
