//! Round resolvers.
//!
//! Every function here is pure: it reads a round's submissions and returns
//! the outcome. Nothing touches the RNG, the clock or game state, so a
//! resolver gives the same answer however many times it is asked.

use std::collections::BTreeMap;

use huddle_protocol::PlayerId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Distance bands (Wavelength)
// ---------------------------------------------------------------------------

/// Points for a dial guess: 4 within 5, 3 within 10, 2 within 20,
/// 1 within 30, otherwise 0.
pub fn wavelength_points(guess: u8, target: u8) -> u32 {
    match guess.abs_diff(target) {
        0..=5 => 4,
        6..=10 => 3,
        11..=20 => 2,
        21..=30 => 1,
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Minority / majority bonuses
// ---------------------------------------------------------------------------

/// Points the Never-Ever minority splits.
pub const MINORITY_POOL: u32 = 20;
/// Most a single minority player can take from the pool.
pub const MINORITY_CAP: u32 = 10;

/// Who shares the Never-Ever pool, and how much each gets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinorityAward {
    /// The minority answer, or `None` for an even split or a unanimous
    /// round.
    pub side: Option<bool>,
    pub winners: Vec<PlayerId>,
    pub share: u32,
}

/// The strictly smaller side splits [`MINORITY_POOL`] evenly, each share
/// capped at [`MINORITY_CAP`].
pub fn minority_split(answers: &BTreeMap<PlayerId, bool>) -> MinorityAward {
    let yes: Vec<PlayerId> = answers.iter().filter(|(_, a)| **a).map(|(p, _)| *p).collect();
    let no: Vec<PlayerId> = answers.iter().filter(|(_, a)| !**a).map(|(p, _)| *p).collect();

    let (side, winners) = match yes.len().cmp(&no.len()) {
        _ if yes.is_empty() || no.is_empty() => (None, Vec::new()),
        std::cmp::Ordering::Less => (Some(true), yes),
        std::cmp::Ordering::Greater => (Some(false), no),
        std::cmp::Ordering::Equal => (None, Vec::new()),
    };

    let share = if winners.is_empty() {
        0
    } else {
        (MINORITY_POOL / winners.len() as u32).min(MINORITY_CAP)
    };

    MinorityAward {
        side,
        winners,
        share,
    }
}

/// Flat bonus for the This-or-That majority.
pub const MAJORITY_BONUS: u32 = 100;

/// The option picked by strictly more players than any other, and who
/// picked it. A tie for the top has no majority.
pub fn majority<C: Ord + Copy>(choices: &BTreeMap<PlayerId, C>) -> (Option<C>, Vec<PlayerId>) {
    let mut counts: BTreeMap<C, usize> = BTreeMap::new();
    for choice in choices.values() {
        *counts.entry(*choice).or_default() += 1;
    }
    let best = counts.values().copied().max().unwrap_or(0);
    let mut top = counts.iter().filter(|(_, n)| **n == best);
    match (top.next(), top.next()) {
        (Some((choice, _)), None) => {
            let winners = choices
                .iter()
                .filter(|(_, c)| *c == choice)
                .map(|(p, _)| *p)
                .collect();
            (Some(*choice), winners)
        }
        _ => (None, Vec::new()),
    }
}

/// Flat bonus for matching the Hot Takes mode.
pub const MODAL_BONUS: u32 = 100;
/// Lowest and highest Hot Takes rating.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// The most common ratings (every bucket tied for the top count) and the
/// players who gave one of them.
pub fn modal_ratings(ratings: &BTreeMap<PlayerId, u8>) -> (Vec<u8>, Vec<PlayerId>) {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for rating in ratings.values() {
        *counts.entry(*rating).or_default() += 1;
    }
    let Some(best) = counts.values().copied().max() else {
        return (Vec::new(), Vec::new());
    };
    let modes: Vec<u8> = counts
        .iter()
        .filter(|(_, n)| **n == best)
        .map(|(r, _)| *r)
        .collect();
    let winners = ratings
        .iter()
        .filter(|(_, r)| modes.contains(*r))
        .map(|(p, _)| *p)
        .collect();
    (modes, winners)
}

// ---------------------------------------------------------------------------
// Vote tallies
// ---------------------------------------------------------------------------

/// Points per vote received.
pub const VOTE_POINTS: u32 = 100;

/// Votes received per candidate, from a voter → candidate map.
pub fn tally(votes: &BTreeMap<PlayerId, PlayerId>) -> BTreeMap<PlayerId, u32> {
    let mut counts = BTreeMap::new();
    for candidate in votes.values() {
        *counts.entry(*candidate).or_default() += 1;
    }
    counts
}

/// Points per candidate: votes × [`VOTE_POINTS`].
pub fn vote_points(votes: &BTreeMap<PlayerId, PlayerId>) -> BTreeMap<PlayerId, u32> {
    tally(votes)
        .into_iter()
        .map(|(p, n)| (p, n * VOTE_POINTS))
        .collect()
}

/// Result of a "vote someone out" tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopVote {
    /// The first top-voted player in seating order.
    pub chosen: Option<PlayerId>,
    /// Everyone sharing the top count (one entry when it is clear-cut).
    pub tied: Vec<PlayerId>,
    pub votes: u32,
}

/// Picks the most-voted player. Ties go to the earliest of `seating`.
pub fn top_voted(votes: &BTreeMap<PlayerId, PlayerId>, seating: &[PlayerId]) -> TopVote {
    let counts = tally(votes);
    let best = counts.values().copied().max().unwrap_or(0);
    let tied: Vec<PlayerId> = if best == 0 {
        Vec::new()
    } else {
        seating
            .iter()
            .copied()
            .filter(|p| counts.get(p) == Some(&best))
            .collect()
    };
    TopVote {
        chosen: tied.first().copied(),
        tied,
        votes: best,
    }
}

// ---------------------------------------------------------------------------
// NPAT
// ---------------------------------------------------------------------------

/// A valid answer nobody else gave.
pub const UNIQUE_ANSWER: u32 = 10;
/// A valid answer someone else also gave.
pub const SHARED_ANSWER: u32 = 5;

fn normalized(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Returns `true` if `answer` is non-empty and starts with `letter`
/// (case-insensitive, ignoring surrounding whitespace).
pub fn npat_valid(letter: char, answer: &str) -> bool {
    normalized(answer)
        .chars()
        .next()
        .is_some_and(|first| letter.to_lowercase().eq(first.to_lowercase()))
}

/// Points per category for every player.
///
/// `answers[player][i]` is the player's answer for category `i`. Invalid
/// answers score 0 whatever anyone else wrote; a valid answer shared with
/// another player's valid answer in the same category scores
/// [`SHARED_ANSWER`], otherwise [`UNIQUE_ANSWER`].
pub fn npat_scores(
    letter: char,
    answers: &BTreeMap<PlayerId, Vec<String>>,
) -> BTreeMap<PlayerId, Vec<u32>> {
    let categories = answers.values().map(Vec::len).max().unwrap_or(0);

    let mut seen: Vec<BTreeMap<String, usize>> = vec![BTreeMap::new(); categories];
    for sheet in answers.values() {
        for (i, answer) in sheet.iter().enumerate() {
            if npat_valid(letter, answer) {
                *seen[i].entry(normalized(answer)).or_default() += 1;
            }
        }
    }

    answers
        .iter()
        .map(|(player, sheet)| {
            let points = (0..categories)
                .map(|i| match sheet.get(i) {
                    Some(answer) if npat_valid(letter, answer) => {
                        if seen[i].get(&normalized(answer)).copied().unwrap_or(0) > 1 {
                            SHARED_ANSWER
                        } else {
                            UNIQUE_ANSWER
                        }
                    }
                    _ => 0,
                })
                .collect();
            (*player, points)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Median-target betting (Bet-or-Bluff)
// ---------------------------------------------------------------------------

/// Bonus for the guesser closest to the target.
pub const CLOSEST_BONUS: u32 = 25;

/// Median of `values`; the two middle values are averaged for an even
/// count. `None` for no values.
pub fn median(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
    } else {
        Some(sorted[mid] as f64)
    }
}

/// The guesser nearest `target`. `guesses` must be in seating order; ties
/// go to the earliest seat.
pub fn closest(guesses: &[(PlayerId, i64)], target: f64) -> Option<PlayerId> {
    let mut best: Option<(PlayerId, f64)> = None;
    for (player, guess) in guesses {
        let distance = (*guess as f64 - target).abs();
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((*player, distance)),
        }
    }
    best.map(|(p, _)| p)
}

/// A chip wager on a guesser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    pub on: PlayerId,
    pub amount: u32,
}

/// One player's balance change in a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub player: PlayerId,
    pub delta: i64,
    pub balance: u32,
}

/// Settles a betting round.
///
/// Backers of `winner` gain their wager; everyone else who bet loses it,
/// with balances floored at zero. `winner` also gets [`CLOSEST_BONUS`].
/// Returns one payout per player in `balances`.
pub fn settle(
    balances: &BTreeMap<PlayerId, u32>,
    wagers: &BTreeMap<PlayerId, Wager>,
    winner: PlayerId,
) -> Vec<Payout> {
    balances
        .iter()
        .map(|(player, balance)| {
            let mut next = i64::from(*balance);
            if let Some(wager) = wagers.get(player) {
                if wager.on == winner {
                    next += i64::from(wager.amount);
                } else {
                    next -= i64::from(wager.amount);
                }
            }
            if *player == winner {
                next += i64::from(CLOSEST_BONUS);
            }
            let next = next.max(0);
            Payout {
                player: *player,
                delta: next - i64::from(*balance),
                balance: u32::try_from(next).unwrap_or(u32::MAX),
            }
        })
        .collect()
}
