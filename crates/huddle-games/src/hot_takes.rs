//! Hot Takes: rate a statement from 1 to 5; matching the table's most
//! common rating scores.

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, Seat, Submissions};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::content::HOT_TAKES;
use crate::rules::{NEXT_ROUND_DELAY, Roster, Rules, Scoreboard, Standing, deal};
use crate::scoring::{MODAL_BONUS, RATING_RANGE, modal_ratings};

pub const ROUNDS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Rate { rating: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub player: PlayerId,
    pub rating: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    RoundStarted { round: u32, rounds: u32, take: String },
    Rated { player: PlayerId },
    RoundResults {
        ratings: Vec<Rating>,
        modes: Vec<u8>,
        winners: Vec<PlayerId>,
        scores: Vec<Standing>,
    },
    GameOver { scores: Vec<Standing> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    NextRound(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Rating,
    Results,
    Ended,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Rating, Step::Results) | (Step::Results, Step::Rating) | (Step::Results, Step::Ended)
        )
    }
}

#[derive(Debug)]
pub struct HotTakes {
    roster: Roster,
    phase: PhaseMachine<Step>,
    round: u32,
    takes: Vec<&'static str>,
    ratings: Submissions<u8>,
    scores: Scoreboard,
}

impl HotTakes {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    fn deal_round(&mut self) -> Effects<Event, Timer> {
        self.round += 1;
        self.ratings = Submissions::new(self.roster.ids());
        let take = self.takes[(self.round as usize - 1) % self.takes.len()];
        let mut fx = Effects::none();
        fx.broadcast(Event::RoundStarted {
            round: self.round,
            rounds: ROUNDS,
            take: take.to_string(),
        });
        fx
    }

    fn resolve(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Rating, Step::Results).is_err() {
            return Effects::none();
        }
        let (modes, winners) = modal_ratings(self.ratings.entries());
        for player in &winners {
            self.scores.add(*player, MODAL_BONUS);
        }

        let mut fx = Effects::none();
        fx.broadcast(Event::RoundResults {
            ratings: self
                .ratings
                .iter()
                .map(|(player, rating)| Rating {
                    player,
                    rating: *rating,
                })
                .collect(),
            modes,
            winners,
            scores: self.scores.standings(),
        });
        if self.round >= ROUNDS {
            let ended = self.phase.advance(Step::Results, Step::Ended);
            debug_assert!(ended.is_ok(), "{ended:?}");
            fx.broadcast(Event::GameOver {
                scores: self.scores.standings(),
            });
        } else {
            fx.schedule(Timer::NextRound(self.round), NEXT_ROUND_DELAY);
        }
        fx
    }
}

impl Rules for HotTakes {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut game = HotTakes {
            phase: PhaseMachine::new(Step::Rating),
            round: 0,
            takes: deal(HOT_TAKES, ROUNDS as usize, rng),
            ratings: Submissions::default(),
            scores: Scoreboard::new(&roster),
            roster,
        };
        let fx = game.deal_round();
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        let Action::Rate { rating } = action;
        if !self.phase.is(Step::Rating) {
            return Ok(Effects::none());
        }
        if !RATING_RANGE.contains(&rating) {
            return Err(ActionError::new("Rating must be between 1 and 5"));
        }
        self.ratings.submit(sender, rating)?;
        let mut fx = Effects::none();
        fx.broadcast(Event::Rated { player: sender });
        if self.ratings.is_complete() {
            fx.append(self.resolve());
        }
        Ok(fx)
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {
            Timer::NextRound(round) if round == self.round => {
                if self.phase.advance(Step::Results, Step::Rating).is_err() {
                    return Effects::none();
                }
                self.deal_round()
            }
            _ => Effects::none(),
        }
    }

    fn is_finished(&self) -> bool {
        self.phase.is(Step::Ended)
    }
}
