//! Shared plumbing for the individual games: the per-game trait, seating,
//! score keeping and input cleaning.

use std::collections::BTreeMap;
use std::time::Duration;

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, PlayerLimits, Seat};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Pause between a round's results and the next round.
pub const NEXT_ROUND_DELAY: Duration = Duration::from_secs(5);

/// Longest free-text submission (clues, lines, statements).
pub const MAX_TEXT_LEN: usize = 140;

/// One game's rules. [`crate::Party`] wraps every implementation in a
/// single `GameLogic`.
pub trait Rules: Sized {
    type Action;
    type Event;
    type Timer;

    /// Seated player bounds.
    fn limits() -> PlayerLimits {
        PlayerLimits::GENERIC
    }

    /// Deals the game.
    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Self::Event, Self::Timer>);

    /// Processes one input. Input for another phase returns no effects.
    fn handle(
        &mut self,
        sender: PlayerId,
        action: Self::Action,
        rng: &mut StdRng,
    ) -> ActionResult<Self::Event, Self::Timer>;

    /// A timer armed by this game fired.
    fn on_timer(&mut self, timer: Self::Timer, rng: &mut StdRng) -> Effects<Self::Event, Self::Timer>;

    /// Returns `true` once the game is over.
    fn is_finished(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// The seated players of a game, in seating order.
#[derive(Debug, Clone)]
pub struct Roster {
    seats: Vec<Seat>,
}

impl Roster {
    pub fn new(seats: &[Seat]) -> Self {
        Self {
            seats: seats.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.seats.iter().map(|s| s.id)
    }

    /// The player in seat `index`, wrapping around the table.
    pub fn at(&self, index: usize) -> PlayerId {
        self.seats[index % self.seats.len()].id
    }

    pub fn index_of(&self, id: PlayerId) -> Option<usize> {
        self.seats.iter().position(|s| s.id == id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn name(&self, id: PlayerId) -> &str {
        self.seats
            .iter()
            .find(|s| s.id == id)
            .map_or("", |s| s.name.as_str())
    }

    /// The seat that hosted the room when the game was dealt.
    pub fn host(&self) -> Option<PlayerId> {
        self.seats.iter().find(|s| s.is_host).map(|s| s.id)
    }

    /// Everyone except `excluded`.
    pub fn others(&self, excluded: PlayerId) -> impl Iterator<Item = PlayerId> + '_ {
        self.ids().filter(move |id| *id != excluded)
    }

    /// Fails unless `id` is seated.
    pub fn require(&self, id: PlayerId) -> Result<(), ActionError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(ActionError::new("That player is not in this game"))
        }
    }

    /// Fails unless `sender` may drive the table between rounds.
    pub fn require_host(&self, sender: PlayerId) -> Result<(), ActionError> {
        match self.host() {
            Some(host) if host != sender => Err(ActionError::new("Only the host can do that")),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// One line of a scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player: PlayerId,
    pub score: u32,
}

/// Running scores, one per seated player.
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    scores: BTreeMap<PlayerId, u32>,
    /// Seating order, for stable standings.
    order: Vec<PlayerId>,
}

impl Scoreboard {
    pub fn new(roster: &Roster) -> Self {
        Self {
            scores: roster.ids().map(|id| (id, 0)).collect(),
            order: roster.ids().collect(),
        }
    }

    pub fn add(&mut self, player: PlayerId, points: u32) {
        if let Some(score) = self.scores.get_mut(&player) {
            *score += points;
        }
    }

    pub fn get(&self, player: PlayerId) -> u32 {
        self.scores.get(&player).copied().unwrap_or(0)
    }

    /// Scores from highest to lowest; ties keep seating order.
    pub fn standings(&self) -> Vec<Standing> {
        let mut lines: Vec<Standing> = self
            .order
            .iter()
            .map(|&player| Standing {
                player,
                score: self.get(player),
            })
            .collect();
        lines.sort_by(|a, b| b.score.cmp(&a.score));
        lines
    }

    /// Everyone holding the top score.
    pub fn leaders(&self) -> Vec<PlayerId> {
        let best = self.scores.values().copied().max().unwrap_or(0);
        self.order
            .iter()
            .copied()
            .filter(|p| self.get(*p) == best)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Trims `raw` and rejects empty or overlong text.
pub fn clean_text(raw: &str, what: &str) -> Result<String, ActionError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ActionError::new(format!("{what} cannot be empty")));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(ActionError::new(format!(
            "{what} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(text.to_string())
}

/// Draws `count` cards from `deck` without repeats (fewer if the deck is
/// smaller).
pub fn deal<T: Clone>(deck: &[T], count: usize, rng: &mut StdRng) -> Vec<T> {
    let mut cards = deck.to_vec();
    cards.shuffle(rng);
    cards.truncate(count);
    cards
}
