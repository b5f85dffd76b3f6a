//! Insider: the master answers yes/no questions about a secret word; one
//! of the questioners secretly already knows it.
//!
//! `questions` ends when the master reports the word was guessed (or the
//! five-minute clock runs out and everyone loses), then everyone votes for
//! the suspected insider. The insider is caught only by a strict plurality.

use std::collections::BTreeMap;
use std::time::Duration;

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, PlayerLimits, Seat, Submissions};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};

use crate::content::INSIDER_WORDS;
use crate::rules::{Roster, Rules};
use crate::scoring::tally;

/// Time the table has to find the word.
pub const QUESTION_TIME: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Master,
    Insider,
    Common,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Master only: `guesser` said the word.
    WordGuessed { guesser: PlayerId },
    Vote { suspect: PlayerId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suspicion {
    pub player: PlayerId,
    pub votes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    /// Private: your role, plus the word for the master and the insider.
    Role { role: Role, word: Option<String> },
    QuestionsStarted { master: PlayerId, seconds: u64 },
    WordGuessed { guesser: PlayerId, word: String },
    VotingStarted,
    TimeUp { word: String },
    Results {
        insider: PlayerId,
        caught: bool,
        tally: Vec<Suspicion>,
        word: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    QuestionsOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Questions,
    Voting,
    Results,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Questions, Step::Voting)
                | (Step::Questions, Step::Results)
                | (Step::Voting, Step::Results)
        )
    }
}

/// How the round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The word was never found; nobody wins.
    TimeUp,
    InsiderCaught,
    InsiderEscaped,
}

#[derive(Debug)]
pub struct Insider {
    roster: Roster,
    phase: PhaseMachine<Step>,
    master: PlayerId,
    insider: PlayerId,
    word: &'static str,
    votes: Submissions<PlayerId>,
    outcome: Option<Outcome>,
}

/// Returns the player with strictly more votes than anyone else.
fn strict_leader(votes: &BTreeMap<PlayerId, PlayerId>) -> Option<PlayerId> {
    let counts = tally(votes);
    let best = counts.values().copied().max()?;
    let mut top = counts.iter().filter(|(_, n)| **n == best);
    match (top.next(), top.next()) {
        (Some((player, _)), None) => Some(*player),
        _ => None,
    }
}

impl Insider {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn master(&self) -> PlayerId {
        self.master
    }

    pub fn insider(&self) -> PlayerId {
        self.insider
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    fn word_guessed(&mut self, sender: PlayerId, guesser: PlayerId) -> ActionResult<Event, Timer> {
        if !self.phase.is(Step::Questions) {
            return Ok(Effects::none());
        }
        if sender != self.master {
            return Err(ActionError::new("Only the master can confirm the word"));
        }
        self.roster.require(guesser)?;
        if guesser == self.master {
            return Err(ActionError::new("The master cannot guess their own word"));
        }
        if self.phase.advance(Step::Questions, Step::Voting).is_err() {
            return Ok(Effects::none());
        }

        let mut fx = Effects::none();
        fx.cancel(Timer::QuestionsOver)
            .broadcast(Event::WordGuessed {
                guesser,
                word: self.word.to_string(),
            })
            .broadcast(Event::VotingStarted);
        Ok(fx)
    }

    fn vote(&mut self, sender: PlayerId, suspect: PlayerId) -> ActionResult<Event, Timer> {
        if !self.phase.is(Step::Voting) {
            return Ok(Effects::none());
        }
        self.roster.require(suspect)?;
        if suspect == sender {
            return Err(ActionError::new("You cannot vote for yourself"));
        }
        self.votes.submit(sender, suspect)?;
        if !self.votes.is_complete() {
            return Ok(Effects::none());
        }
        if self.phase.advance(Step::Voting, Step::Results).is_err() {
            return Ok(Effects::none());
        }

        let caught = strict_leader(self.votes.entries()) == Some(self.insider);
        self.outcome = Some(if caught {
            Outcome::InsiderCaught
        } else {
            Outcome::InsiderEscaped
        });

        let counts = tally(self.votes.entries());
        let tally = self
            .roster
            .ids()
            .map(|player| Suspicion {
                player,
                votes: counts.get(&player).copied().unwrap_or(0),
            })
            .collect();

        let mut fx = Effects::none();
        fx.broadcast(Event::Results {
            insider: self.insider,
            caught,
            tally,
            word: self.word.to_string(),
        });
        Ok(fx)
    }
}

impl Rules for Insider {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn limits() -> PlayerLimits {
        PlayerLimits::new(4, 8)
    }

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut order: Vec<PlayerId> = roster.ids().collect();
        order.shuffle(rng);
        let master = order[0];
        let insider = order[1];
        let word = INSIDER_WORDS.choose(rng).copied().unwrap_or(INSIDER_WORDS[0]);

        let mut fx = Effects::none();
        for player in roster.ids() {
            let (role, word) = if player == master {
                (Role::Master, Some(word.to_string()))
            } else if player == insider {
                (Role::Insider, Some(word.to_string()))
            } else {
                (Role::Common, None)
            };
            fx.send_to(player, Event::Role { role, word });
        }
        fx.broadcast(Event::QuestionsStarted {
            master,
            seconds: QUESTION_TIME.as_secs(),
        })
        .schedule(Timer::QuestionsOver, QUESTION_TIME);

        let game = Insider {
            phase: PhaseMachine::new(Step::Questions),
            master,
            insider,
            word,
            votes: Submissions::new(roster.ids()),
            outcome: None,
            roster,
        };
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        match action {
            Action::WordGuessed { guesser } => self.word_guessed(sender, guesser),
            Action::Vote { suspect } => self.vote(sender, suspect),
        }
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {
            Timer::QuestionsOver => {
                if self.phase.advance(Step::Questions, Step::Results).is_err() {
                    return Effects::none();
                }
                self.outcome = Some(Outcome::TimeUp);
                let mut fx = Effects::none();
                fx.broadcast(Event::TimeUp {
                    word: self.word.to_string(),
                });
                fx
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.phase.is(Step::Results)
    }
}
