//! Imposter: everyone but one player knows the word.
//!
//! `clues → voting → results`, then the host deals the next round. The
//! most-voted player is voted out; the imposter wins the round unless it
//! was them.

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, Seat, Submissions};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::content::IMPOSTER_WORDS;
use crate::rules::{Roster, Rules, Scoreboard, Standing, clean_text};
use crate::scoring::{TopVote, top_voted};

/// Rounds per game.
pub const ROUNDS: u32 = 5;
/// Points for the imposter when they survive the vote.
pub const IMPOSTER_ESCAPE: u32 = 200;
/// Points for each player who voted for the imposter.
pub const CORRECT_VOTE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Clue { text: String },
    Vote { suspect: PlayerId },
    /// Host only, from results: deal the next round.
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    pub player: PlayerId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCast {
    pub voter: PlayerId,
    pub suspect: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    RoundStarted { round: u32, rounds: u32 },
    /// Private: the secret word.
    SecretWord { word: String },
    /// Private, to the imposter only.
    YouAreImposter,
    CluesRevealed { clues: Vec<Clue> },
    Results {
        votes: Vec<VoteCast>,
        outcome: TopVote,
        imposter: PlayerId,
        word: String,
        imposter_wins: bool,
        scores: Vec<Standing>,
    },
    GameOver { scores: Vec<Standing> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Clues,
    Voting,
    Results,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Clues, Step::Voting) | (Step::Voting, Step::Results) | (Step::Results, Step::Clues)
        )
    }
}

#[derive(Debug)]
pub struct Imposter {
    roster: Roster,
    phase: PhaseMachine<Step>,
    round: u32,
    imposter: PlayerId,
    word: &'static str,
    clues: Submissions<String>,
    votes: Submissions<PlayerId>,
    scores: Scoreboard,
}

impl Imposter {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn imposter(&self) -> PlayerId {
        self.imposter
    }

    pub fn word(&self) -> &str {
        self.word
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    /// Picks the imposter and word and tells everyone their part.
    fn deal(&mut self, rng: &mut StdRng) -> Effects<Event, Timer> {
        let ids: Vec<PlayerId> = self.roster.ids().collect();
        self.imposter = ids.choose(rng).copied().unwrap_or(self.imposter);
        self.word = IMPOSTER_WORDS.choose(rng).copied().unwrap_or(self.word);
        self.round += 1;
        self.clues = Submissions::new(self.roster.ids());
        self.votes = Submissions::new(self.roster.ids());

        let mut fx = Effects::none();
        fx.broadcast(Event::RoundStarted {
            round: self.round,
            rounds: ROUNDS,
        });
        for player in self.roster.ids() {
            if player == self.imposter {
                fx.send_to(player, Event::YouAreImposter);
            } else {
                fx.send_to(
                    player,
                    Event::SecretWord {
                        word: self.word.to_string(),
                    },
                );
            }
        }
        fx
    }

    fn resolve_clues(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Clues, Step::Voting).is_err() {
            return Effects::none();
        }
        let clues = self
            .clues
            .iter()
            .map(|(player, text)| Clue {
                player,
                text: text.clone(),
            })
            .collect();
        let mut fx = Effects::none();
        fx.broadcast(Event::CluesRevealed { clues });
        fx
    }

    fn resolve_votes(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Voting, Step::Results).is_err() {
            return Effects::none();
        }
        let seating: Vec<PlayerId> = self.roster.ids().collect();
        let outcome = top_voted(self.votes.entries(), &seating);
        let imposter_wins = outcome.chosen != Some(self.imposter);

        if imposter_wins {
            self.scores.add(self.imposter, IMPOSTER_ESCAPE);
        }
        for (voter, suspect) in self.votes.iter() {
            if *suspect == self.imposter {
                self.scores.add(voter, CORRECT_VOTE);
            }
        }

        let mut fx = Effects::none();
        fx.broadcast(Event::Results {
            votes: self
                .votes
                .iter()
                .map(|(voter, suspect)| VoteCast {
                    voter,
                    suspect: *suspect,
                })
                .collect(),
            outcome,
            imposter: self.imposter,
            word: self.word.to_string(),
            imposter_wins,
            scores: self.scores.standings(),
        });
        if self.round >= ROUNDS {
            fx.broadcast(Event::GameOver {
                scores: self.scores.standings(),
            });
        }
        fx
    }
}

impl Rules for Imposter {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut game = Imposter {
            phase: PhaseMachine::new(Step::Clues),
            round: 0,
            imposter: roster.at(0),
            word: IMPOSTER_WORDS[0],
            clues: Submissions::default(),
            votes: Submissions::default(),
            scores: Scoreboard::new(&roster),
            roster,
        };
        let fx = game.deal(rng);
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, rng: &mut StdRng) -> ActionResult<Event, Timer> {
        match action {
            Action::Clue { text } => {
                if !self.phase.is(Step::Clues) {
                    return Ok(Effects::none());
                }
                let text = clean_text(&text, "Clue")?;
                self.clues.submit(sender, text)?;
                Ok(if self.clues.is_complete() {
                    self.resolve_clues()
                } else {
                    Effects::none()
                })
            }
            Action::Vote { suspect } => {
                if !self.phase.is(Step::Voting) {
                    return Ok(Effects::none());
                }
                self.roster.require(suspect)?;
                if suspect == sender {
                    return Err(ActionError::new("You cannot vote for yourself"));
                }
                self.votes.submit(sender, suspect)?;
                Ok(if self.votes.is_complete() {
                    self.resolve_votes()
                } else {
                    Effects::none()
                })
            }
            Action::Next => {
                if !self.phase.is(Step::Results) || self.round >= ROUNDS {
                    return Ok(Effects::none());
                }
                self.roster.require_host(sender)?;
                if self.phase.advance(Step::Results, Step::Clues).is_err() {
                    return Ok(Effects::none());
                }
                Ok(self.deal(rng))
            }
        }
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {}
    }

    fn is_finished(&self) -> bool {
        self.round >= ROUNDS && self.phase.is(Step::Results)
    }
}


#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_wrong_vote_lets_the_imposter_escape() {
        let mut rng = StdRng::seed_from_u64(11);
        let seats: Vec<Seat> = (1..=4)
            .map(|i| Seat::new(PlayerId(i), format!("P{i}")).with_host(i == 1))
            .collect();
        let (mut game, _) = Imposter::start(&seats, &mut rng);
        let imposter = game.imposter();

        let err = game
            .handle(PlayerId(1), Action::Clue { text: "   ".into() }, &mut rng)
            .unwrap_err();
        assert_eq!(err, ActionError::new("Clue cannot be empty"));
        for id in 1..=4 {
            game.handle(PlayerId(id), Action::Clue { text: format!("hint {id}") }, &mut rng)
                .unwrap();
        }
        assert_eq!(game.phase(), Step::Voting);

        let scapegoat = (1..=4).map(PlayerId).find(|p| *p != imposter).unwrap();
        for id in (1..=4).map(PlayerId) {
            let suspect = if id == scapegoat { imposter } else { scapegoat };
            game.handle(id, Action::Vote { suspect }, &mut rng).unwrap();
        }
        assert_eq!(game.phase(), Step::Results);
        assert_eq!(game.scores().get(imposter), IMPOSTER_ESCAPE);
        assert_eq!(game.scores().get(scapegoat), CORRECT_VOTE);

        let err = game.handle(PlayerId(2), Action::Next, &mut rng).unwrap_err();
        assert_eq!(err, ActionError::new("Only the host can do that"));
        game.handle(PlayerId(1), Action::Next, &mut rng).unwrap();
        assert_eq!(game.round(), 2);
        assert_eq!(game.phase(), Step::Clues);
    }
}
