//! Never-Ever: "never have I ever ..."; the minority shares a small pool.

use huddle_protocol::PlayerId;
use huddle_room::{ActionResult, Effects, Phase, PhaseMachine, Seat, Submissions};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::content::NEVER_EVER;
use crate::rules::{NEXT_ROUND_DELAY, Roster, Rules, Scoreboard, Standing, deal};
use crate::scoring::{MinorityAward, minority_split};

pub const ROUNDS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// `true`: "I have".
    Answer { have: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confession {
    pub player: PlayerId,
    pub have: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    RoundStarted { round: u32, rounds: u32, prompt: String },
    Answered { player: PlayerId },
    RoundResults {
        answers: Vec<Confession>,
        award: MinorityAward,
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
    Answering,
    Results,
    Ended,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Answering, Step::Results) | (Step::Results, Step::Answering) | (Step::Results, Step::Ended)
        )
    }
}

#[derive(Debug)]
pub struct NeverEver {
    roster: Roster,
    phase: PhaseMachine<Step>,
    round: u32,
    prompts: Vec<&'static str>,
    answers: Submissions<bool>,
    scores: Scoreboard,
}

impl NeverEver {
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
        self.answers = Submissions::new(self.roster.ids());
        let prompt = self.prompts[(self.round as usize - 1) % self.prompts.len()];
        let mut fx = Effects::none();
        fx.broadcast(Event::RoundStarted {
            round: self.round,
            rounds: ROUNDS,
            prompt: prompt.to_string(),
        });
        fx
    }

    fn resolve(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Answering, Step::Results).is_err() {
            return Effects::none();
        }
        let award = minority_split(self.answers.entries());
        for player in &award.winners {
            self.scores.add(*player, award.share);
        }

        let mut fx = Effects::none();
        fx.broadcast(Event::RoundResults {
            answers: self
                .answers
                .iter()
                .map(|(player, have)| Confession { player, have: *have })
                .collect(),
            award,
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

impl Rules for NeverEver {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut game = NeverEver {
            phase: PhaseMachine::new(Step::Answering),
            round: 0,
            prompts: deal(NEVER_EVER, ROUNDS as usize, rng),
            answers: Submissions::default(),
            scores: Scoreboard::new(&roster),
            roster,
        };
        let fx = game.deal_round();
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        let Action::Answer { have } = action;
        if !self.phase.is(Step::Answering) {
            return Ok(Effects::none());
        }
        self.answers.submit(sender, have)?;
        let mut fx = Effects::none();
        fx.broadcast(Event::Answered { player: sender });
        if self.answers.is_complete() {
            fx.append(self.resolve());
        }
        Ok(fx)
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {
            Timer::NextRound(round) if round == self.round => {
                if self.phase.advance(Step::Results, Step::Answering).is_err() {
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

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_minority_shares_pool() {
        let mut rng = StdRng::seed_from_u64(8);
        let seats: Vec<Seat> = (1..=5).map(|i| Seat::new(PlayerId(i), format!("P{i}"))).collect();
        let (mut game, _) = NeverEver::start(&seats, &mut rng);
        for id in 1..=5 {
            let have = id <= 2;
            game.handle(PlayerId(id), Action::Answer { have }, &mut rng).unwrap();
        }
        assert_eq!(game.phase(), Step::Results);
        assert_eq!(game.scores().get(PlayerId(1)), 10);
        assert_eq!(game.scores().get(PlayerId(2)), 10);
        assert_eq!(game.scores().get(PlayerId(3)), 0);
        assert!(game.handle(PlayerId(1), Action::Answer { have: false }, &mut rng).unwrap().is_empty());
    }
}
