//! This-or-That: pick a side; the majority scores.

use huddle_protocol::PlayerId;
use huddle_room::{ActionResult, Effects, Phase, PhaseMachine, Seat, Submissions};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::content::THIS_OR_THAT;
use crate::rules::{NEXT_ROUND_DELAY, Roster, Rules, Scoreboard, Standing, deal};
use crate::scoring::{MAJORITY_BONUS, majority};

pub const ROUNDS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pick {
    This,
    That,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Choose { pick: Pick },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub player: PlayerId,
    pub pick: Pick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    RoundStarted {
        round: u32,
        rounds: u32,
        this: String,
        that: String,
    },
    Chosen { player: PlayerId },
    RoundResults {
        picks: Vec<Choice>,
        /// `None` on an even split.
        majority: Option<Pick>,
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
    Choosing,
    Results,
    Ended,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Choosing, Step::Results) | (Step::Results, Step::Choosing) | (Step::Results, Step::Ended)
        )
    }
}

#[derive(Debug)]
pub struct ThisOrThat {
    roster: Roster,
    phase: PhaseMachine<Step>,
    round: u32,
    dilemmas: Vec<(&'static str, &'static str)>,
    picks: Submissions<Pick>,
    scores: Scoreboard,
}

impl ThisOrThat {
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
        self.picks = Submissions::new(self.roster.ids());
        let (this, that) = self.dilemmas[(self.round as usize - 1) % self.dilemmas.len()];
        let mut fx = Effects::none();
        fx.broadcast(Event::RoundStarted {
            round: self.round,
            rounds: ROUNDS,
            this: this.to_string(),
            that: that.to_string(),
        });
        fx
    }

    fn resolve(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Choosing, Step::Results).is_err() {
            return Effects::none();
        }
        let (side, winners) = majority(self.picks.entries());
        for player in &winners {
            self.scores.add(*player, MAJORITY_BONUS);
        }

        let mut fx = Effects::none();
        fx.broadcast(Event::RoundResults {
            picks: self
                .picks
                .iter()
                .map(|(player, pick)| Choice { player, pick: *pick })
                .collect(),
            majority: side,
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

impl Rules for ThisOrThat {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut game = ThisOrThat {
            phase: PhaseMachine::new(Step::Choosing),
            round: 0,
            dilemmas: deal(THIS_OR_THAT, ROUNDS as usize, rng),
            picks: Submissions::default(),
            scores: Scoreboard::new(&roster),
            roster,
        };
        let fx = game.deal_round();
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        let Action::Choose { pick } = action;
        if !self.phase.is(Step::Choosing) {
            return Ok(Effects::none());
        }
        self.picks.submit(sender, pick)?;
        let mut fx = Effects::none();
        fx.broadcast(Event::Chosen { player: sender });
        if self.picks.is_complete() {
            fx.append(self.resolve());
        }
        Ok(fx)
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {
            Timer::NextRound(round) if round == self.round => {
                if self.phase.advance(Step::Results, Step::Choosing).is_err() {
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
