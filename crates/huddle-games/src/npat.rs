//! NPAT (Name, Place, Animal, Thing).
//!
//! Five rounds, each on a random letter. Everyone fills in one answer per
//! category; the round resolves when every sheet is in or when the clock
//! runs out, scoring whatever was submitted.

use std::collections::BTreeMap;
use std::time::Duration;

use huddle_protocol::PlayerId;
use huddle_room::{ActionResult, Effects, Phase, PhaseMachine, Seat, Submissions};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::content::NPAT_LETTERS;
use crate::rules::{MAX_TEXT_LEN, NEXT_ROUND_DELAY, Roster, Rules, Scoreboard, Standing, deal};
use crate::scoring::npat_scores;

pub const ROUNDS: u32 = 5;
pub const ROUND_TIME: Duration = Duration::from_secs(60);

/// One player's answers for a round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sheet {
    pub name: String,
    pub place: String,
    pub animal: String,
    pub thing: String,
}

impl Sheet {
    /// Trimmed answers in category order; overlong answers are cut.
    fn answers(&self) -> Vec<String> {
        [&self.name, &self.place, &self.animal, &self.thing]
            .into_iter()
            .map(|a| a.trim().chars().take(MAX_TEXT_LEN).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Submit { answers: Sheet },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetResult {
    pub player: PlayerId,
    pub answers: Vec<String>,
    /// Points per category, in `name, place, animal, thing` order.
    pub points: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    RoundStarted {
        round: u32,
        rounds: u32,
        letter: char,
        seconds: u64,
    },
    Submitted { player: PlayerId },
    RoundResults {
        letter: char,
        sheets: Vec<SheetResult>,
        scores: Vec<Standing>,
    },
    GameOver { scores: Vec<Standing> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    RoundTimeout(u32),
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
pub struct Npat {
    roster: Roster,
    phase: PhaseMachine<Step>,
    round: u32,
    letters: Vec<char>,
    sheets: Submissions<Sheet>,
    scores: Scoreboard,
}

impl Npat {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn letter(&self) -> char {
        self.letters[(self.round.max(1) as usize - 1) % self.letters.len()]
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    fn deal_round(&mut self) -> Effects<Event, Timer> {
        self.round += 1;
        self.sheets = Submissions::new(self.roster.ids());
        let mut fx = Effects::none();
        fx.broadcast(Event::RoundStarted {
            round: self.round,
            rounds: ROUNDS,
            letter: self.letter(),
            seconds: ROUND_TIME.as_secs(),
        })
        .schedule(Timer::RoundTimeout(self.round), ROUND_TIME);
        fx
    }

    fn resolve(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Answering, Step::Results).is_err() {
            return Effects::none();
        }
        let letter = self.letter();
        let answers: BTreeMap<PlayerId, Vec<String>> = self
            .sheets
            .iter()
            .map(|(player, sheet)| (player, sheet.answers()))
            .collect();
        let points = npat_scores(letter, &answers);

        let mut sheets = Vec::with_capacity(answers.len());
        for player in self.roster.ids() {
            let (Some(answers), Some(points)) = (answers.get(&player), points.get(&player)) else {
                continue;
            };
            self.scores.add(player, points.iter().sum());
            sheets.push(SheetResult {
                player,
                answers: answers.clone(),
                points: points.clone(),
            });
        }

        let mut fx = Effects::none();
        fx.cancel(Timer::RoundTimeout(self.round))
            .broadcast(Event::RoundResults {
                letter,
                sheets,
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

impl Rules for Npat {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut game = Npat {
            phase: PhaseMachine::new(Step::Answering),
            round: 0,
            letters: deal(NPAT_LETTERS, ROUNDS as usize, rng),
            sheets: Submissions::default(),
            scores: Scoreboard::new(&roster),
            roster,
        };
        let fx = game.deal_round();
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        match action {
            Action::Submit { answers } => {
                if !self.phase.is(Step::Answering) {
                    return Ok(Effects::none());
                }
                self.sheets.submit(sender, answers)?;
                let mut fx = Effects::none();
                fx.broadcast(Event::Submitted { player: sender });
                if self.sheets.is_complete() {
                    fx.append(self.resolve());
                }
                Ok(fx)
            }
        }
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {
            Timer::RoundTimeout(round) if round == self.round => self.resolve(),
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
    use super::*;

    #[test]
    fn test_sheet_answers_in_category_order() {
        let sheet = Sheet {
            name: " Bob ".into(),
            place: "Berlin".into(),
            animal: String::new(),
            thing: "Ball".into(),
        };
        assert_eq!(sheet.answers(), vec!["Bob", "Berlin", "", "Ball"]);
    }
}
