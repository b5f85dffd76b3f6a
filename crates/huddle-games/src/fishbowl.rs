//! Celebrity / Fishbowl.
//!
//! Everyone drops three names into the bowl. Two teams (even and odd seats)
//! then take timed turns: the clue giver sees one name at a time and their
//! team tries to get it. The same bowl is played three times, first with
//! free description, then one word, then charades.

use std::time::Duration;

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, PlayerLimits, Seat, Submissions};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::rules::{NEXT_ROUND_DELAY, Roster, Rules, clean_text};

pub const NAMES_PER_PLAYER: usize = 3;
pub const TURN_TIME: Duration = Duration::from_secs(60);
pub const ROUNDS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    Describe,
    OneWord,
    Charades,
}

impl Style {
    pub fn for_round(round: u8) -> Self {
        match round {
            1 => Style::Describe,
            2 => Style::OneWord,
            _ => Style::Charades,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Submit { names: [String; 3] },
    /// Clue giver: the team got the current name.
    Got,
    /// Clue giver: put the current name back.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    Submitted { player: PlayerId },
    RoundStarted { round: u8, style: Style, names: usize },
    TurnStarted {
        turn: u32,
        team: u8,
        giver: PlayerId,
        seconds: u64,
    },
    /// Private, to the clue giver.
    CurrentName { name: String },
    Scored { team: u8, name: String, scores: [u32; 2], remaining: usize },
    Skipped { remaining: usize },
    TurnOver { team: u8, scores: [u32; 2] },
    RoundOver { round: u8, scores: [u32; 2] },
    GameOver { scores: [u32; 2], winner: Option<u8> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    TurnOver(u32),
    NextTurn(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Submitting,
    Playing,
    Between,
    Ended,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Submitting, Step::Playing)
                | (Step::Playing, Step::Between)
                | (Step::Between, Step::Playing)
                | (Step::Playing, Step::Ended)
        )
    }
}

#[derive(Debug)]
pub struct Fishbowl {
    roster: Roster,
    phase: PhaseMachine<Step>,
    submissions: Submissions<[String; 3]>,
    /// Every submitted name; refills the bowl each round.
    names: Vec<String>,
    /// Names still to play this round. The last one is in play.
    bowl: Vec<String>,
    round: u8,
    turn: u32,
    team: u8,
    /// Next clue giver within each team.
    givers: [usize; 2],
    giver: PlayerId,
    scores: [u32; 2],
}

impl Fishbowl {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn round(&self) -> u8 {
        self.round
    }

    pub fn team_scores(&self) -> [u32; 2] {
        self.scores
    }

    pub fn giver(&self) -> PlayerId {
        self.giver
    }

    pub fn current_name(&self) -> Option<&str> {
        self.bowl.last().map(String::as_str)
    }

    pub fn remaining(&self) -> usize {
        self.bowl.len()
    }

    /// Team of the player in `seat`: even seats are team 0.
    pub fn team_of(seat: usize) -> u8 {
        (seat % 2) as u8
    }

    fn members(&self, team: u8) -> Vec<PlayerId> {
        self.roster
            .ids()
            .enumerate()
            .filter(|(seat, _)| Self::team_of(*seat) == team)
            .map(|(_, id)| id)
            .collect()
    }

    fn refill(&mut self, rng: &mut StdRng) {
        self.bowl = self.names.clone();
        self.bowl.shuffle(rng);
    }

    fn begin_turn(&mut self) -> Effects<Event, Timer> {
        self.turn += 1;
        let members = self.members(self.team);
        let slot = self.givers[self.team as usize] % members.len().max(1);
        self.giver = members.get(slot).copied().unwrap_or(self.giver);
        self.givers[self.team as usize] += 1;

        let mut fx = Effects::none();
        fx.broadcast(Event::TurnStarted {
            turn: self.turn,
            team: self.team,
            giver: self.giver,
            seconds: TURN_TIME.as_secs(),
        })
        .schedule(Timer::TurnOver(self.turn), TURN_TIME);
        fx.append(self.show_name());
        fx
    }

    fn show_name(&self) -> Effects<Event, Timer> {
        let mut fx = Effects::none();
        if let Some(name) = self.current_name() {
            fx.send_to(self.giver, Event::CurrentName { name: name.to_string() });
        }
        fx
    }

    fn end_turn(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Playing, Step::Between).is_err() {
            return Effects::none();
        }
        let mut fx = Effects::none();
        fx.cancel(Timer::TurnOver(self.turn))
            .broadcast(Event::TurnOver {
                team: self.team,
                scores: self.scores,
            })
            .schedule(Timer::NextTurn(self.turn), NEXT_ROUND_DELAY);
        self.team = 1 - self.team;
        fx
    }

    fn got(&mut self, rng: &mut StdRng) -> Effects<Event, Timer> {
        let Some(name) = self.bowl.pop() else {
            return Effects::none();
        };
        self.scores[self.team as usize] += 1;
        let mut fx = Effects::none();
        fx.broadcast(Event::Scored {
            team: self.team,
            name,
            scores: self.scores,
            remaining: self.bowl.len(),
        });
        if !self.bowl.is_empty() {
            fx.append(self.show_name());
            return fx;
        }

        fx.broadcast(Event::RoundOver {
            round: self.round,
            scores: self.scores,
        });
        if self.round >= ROUNDS {
            if self.phase.advance(Step::Playing, Step::Ended).is_ok() {
                let winner = match self.scores[0].cmp(&self.scores[1]) {
                    std::cmp::Ordering::Greater => Some(0),
                    std::cmp::Ordering::Less => Some(1),
                    std::cmp::Ordering::Equal => None,
                };
                fx.cancel_all_timers().broadcast(Event::GameOver {
                    scores: self.scores,
                    winner,
                });
            }
            return fx;
        }

        self.round += 1;
        self.refill(rng);
        fx.broadcast(Event::RoundStarted {
            round: self.round,
            style: Style::for_round(self.round),
            names: self.bowl.len(),
        });
        fx.append(self.end_turn());
        fx
    }

    /// The skipped name goes to the bottom of the bowl.
    fn skip(&mut self) -> Effects<Event, Timer> {
        if let Some(name) = self.bowl.pop() {
            self.bowl.insert(0, name);
        }
        let mut fx = Effects::none();
        fx.broadcast(Event::Skipped {
            remaining: self.bowl.len(),
        });
        fx.append(self.show_name());
        fx
    }
}

impl Rules for Fishbowl {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn limits() -> PlayerLimits {
        PlayerLimits::new(4, 16)
    }

    fn start(seats: &[Seat], _rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let game = Fishbowl {
            phase: PhaseMachine::new(Step::Submitting),
            submissions: Submissions::new(roster.ids()),
            names: Vec::new(),
            bowl: Vec::new(),
            round: 0,
            turn: 0,
            team: 0,
            givers: [0, 0],
            giver: roster.at(0),
            scores: [0, 0],
            roster,
        };
        (game, Effects::none())
    }

    fn handle(&mut self, sender: PlayerId, action: Action, rng: &mut StdRng) -> ActionResult<Event, Timer> {
        match action {
            Action::Submit { names } => {
                if !self.phase.is(Step::Submitting) {
                    return Ok(Effects::none());
                }
                let [a, b, c] = names;
                let names = [clean_text(&a, "Name")?, clean_text(&b, "Name")?, clean_text(&c, "Name")?];
                self.submissions.submit(sender, names)?;

                let mut fx = Effects::none();
                fx.broadcast(Event::Submitted { player: sender });
                if !self.submissions.is_complete()
                    || self.phase.advance(Step::Submitting, Step::Playing).is_err()
                {
                    return Ok(fx);
                }
                self.names = self
                    .submissions
                    .iter()
                    .flat_map(|(_, names)| names.iter().cloned())
                    .collect();
                self.round = 1;
                self.refill(rng);
                fx.broadcast(Event::RoundStarted {
                    round: self.round,
                    style: Style::for_round(self.round),
                    names: self.bowl.len(),
                });
                fx.append(self.begin_turn());
                Ok(fx)
            }
            Action::Got | Action::Skip => {
                if !self.phase.is(Step::Playing) {
                    return Ok(Effects::none());
                }
                if sender != self.giver {
                    return Err(ActionError::new("Only the clue giver can do that"));
                }
                Ok(match action {
                    Action::Got => self.got(rng),
                    _ => self.skip(),
                })
            }
        }
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {
            Timer::TurnOver(turn) if turn == self.turn => self.end_turn(),
            Timer::NextTurn(turn) if turn == self.turn => {
                if self.phase.advance(Step::Between, Step::Playing).is_err() {
                    return Effects::none();
                }
                self.begin_turn()
            }
            _ => Effects::none(),
        }
    }

    fn is_finished(&self) -> bool {
        self.phase.is(Step::Ended)
    }
}
