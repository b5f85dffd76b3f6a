//! Two Truths and a Lie.
//!
//! Everyone writes three statements and marks the lie. Players then take
//! the spotlight in seating order while the rest of the table guesses which
//! of their statements is false.

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, Seat, Submissions};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::rules::{NEXT_ROUND_DELAY, Roster, Rules, Scoreboard, Standing, clean_text};

/// Points for spotting the lie.
pub const CORRECT_GUESS: u32 = 100;
/// Points to the spotlight player for each guesser they fooled.
pub const FOOLED: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Submit { statements: [String; 3], lie: u8 },
    Guess { index: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Card {
    statements: [String; 3],
    lie: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LieGuess {
    pub player: PlayerId,
    pub index: u8,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    WritingStarted,
    Submitted { player: PlayerId },
    Spotlight {
        player: PlayerId,
        turn: usize,
        turns: usize,
        statements: [String; 3],
    },
    Reveal {
        player: PlayerId,
        lie: u8,
        guesses: Vec<LieGuess>,
        scores: Vec<Standing>,
    },
    GameOver { scores: Vec<Standing> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    NextSpotlight(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Writing,
    Guessing,
    Reveal,
    Ended,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Writing, Step::Guessing)
                | (Step::Guessing, Step::Reveal)
                | (Step::Reveal, Step::Guessing)
                | (Step::Reveal, Step::Ended)
        )
    }
}

#[derive(Debug)]
pub struct TwoTruths {
    roster: Roster,
    phase: PhaseMachine<Step>,
    cards: Submissions<Card>,
    /// Seat currently in the spotlight.
    turn: usize,
    guesses: Submissions<u8>,
    scores: Scoreboard,
}

impl TwoTruths {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn spotlight(&self) -> PlayerId {
        self.roster.at(self.turn)
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    fn open_spotlight(&mut self) -> Effects<Event, Timer> {
        let player = self.spotlight();
        self.guesses = Submissions::new(self.roster.others(player));
        let statements = self
            .cards
            .get(player)
            .map(|card| card.statements.clone())
            .unwrap_or_default();
        let mut fx = Effects::none();
        fx.broadcast(Event::Spotlight {
            player,
            turn: self.turn + 1,
            turns: self.roster.len(),
            statements,
        });
        fx
    }

    fn resolve(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Guessing, Step::Reveal).is_err() {
            return Effects::none();
        }
        let player = self.spotlight();
        let lie = self.cards.get(player).map_or(0, |card| card.lie);

        let mut guesses = Vec::with_capacity(self.guesses.len());
        let mut fooled = 0;
        for (guesser, index) in self.guesses.iter() {
            let correct = *index == lie;
            if correct {
                self.scores.add(guesser, CORRECT_GUESS);
            } else {
                fooled += 1;
            }
            guesses.push(LieGuess {
                player: guesser,
                index: *index,
                correct,
            });
        }
        self.scores.add(player, fooled * FOOLED);

        let mut fx = Effects::none();
        fx.broadcast(Event::Reveal {
            player,
            lie,
            guesses,
            scores: self.scores.standings(),
        });
        if self.turn + 1 >= self.roster.len() {
            let ended = self.phase.advance(Step::Reveal, Step::Ended);
            debug_assert!(ended.is_ok(), "{ended:?}");
            fx.broadcast(Event::GameOver {
                scores: self.scores.standings(),
            });
        } else {
            fx.schedule(Timer::NextSpotlight(self.turn), NEXT_ROUND_DELAY);
        }
        fx
    }
}

impl Rules for TwoTruths {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn start(seats: &[Seat], _rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let game = TwoTruths {
            phase: PhaseMachine::new(Step::Writing),
            cards: Submissions::new(roster.ids()),
            turn: 0,
            guesses: Submissions::default(),
            scores: Scoreboard::new(&roster),
            roster,
        };
        let mut fx = Effects::none();
        fx.broadcast(Event::WritingStarted);
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        match action {
            Action::Submit { statements, lie } => {
                if !self.phase.is(Step::Writing) {
                    return Ok(Effects::none());
                }
                if lie > 2 {
                    return Err(ActionError::new("The lie must be statement 0, 1 or 2"));
                }
                let [a, b, c] = statements;
                let statements = [
                    clean_text(&a, "Statement")?,
                    clean_text(&b, "Statement")?,
                    clean_text(&c, "Statement")?,
                ];
                self.cards.submit(sender, Card { statements, lie })?;

                let mut fx = Effects::none();
                fx.broadcast(Event::Submitted { player: sender });
                if self.cards.is_complete() && self.phase.advance(Step::Writing, Step::Guessing).is_ok() {
                    fx.append(self.open_spotlight());
                }
                Ok(fx)
            }
            Action::Guess { index } => {
                if !self.phase.is(Step::Guessing) {
                    return Ok(Effects::none());
                }
                if index > 2 {
                    return Err(ActionError::new("Pick statement 0, 1 or 2"));
                }
                if sender == self.spotlight() {
                    return Err(ActionError::new("You cannot guess your own lie"));
                }
                self.guesses.submit(sender, index)?;
                Ok(if self.guesses.is_complete() {
                    self.resolve()
                } else {
                    Effects::none()
                })
            }
        }
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {
            Timer::NextSpotlight(turn) if turn == self.turn => {
                if self.phase.advance(Step::Reveal, Step::Guessing).is_err() {
                    return Effects::none();
                }
                self.turn += 1;
                self.open_spotlight()
            }
            _ => Effects::none(),
        }
    }

    fn is_finished(&self) -> bool {
        self.phase.is(Step::Ended)
    }
}
