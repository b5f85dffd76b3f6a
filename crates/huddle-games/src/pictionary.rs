//! Broken Pictionary: telephone with drawings.
//!
//! Every player starts a chain with a written prompt. The chains then pass
//! around the table, alternating between drawing the previous entry and
//! describing the previous drawing, until each has been through every seat.
//! Chain `i` is handled at step `s` by seat `(i + s) mod n`.

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, Seat, Submissions};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::rules::{Roster, Rules, clean_text};

/// Largest accepted drawing payload, in bytes.
pub const MAX_DRAWING_LEN: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Task {
    Prompt,
    Draw,
    Describe,
}

impl Task {
    pub fn for_step(step: u8) -> Self {
        match step {
            0 => Task::Prompt,
            s if s % 2 == 1 => Task::Draw,
            _ => Task::Describe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Submit { content: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub author: PlayerId,
    pub task: Task,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Who wrote the opening prompt.
    pub owner: PlayerId,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    StepStarted { step: u8, steps: u8, task: Task },
    /// Private: what this player works from.
    YourTurn {
        step: u8,
        task: Task,
        previous: Option<Entry>,
    },
    Submitted { player: PlayerId },
    Reveal { chains: Vec<Chain> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Working(u8),
    Reveal,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        match (self, next) {
            (Step::Working(a), Step::Working(b)) => b == a + 1,
            (Step::Working(_), Step::Reveal) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct Pictionary {
    roster: Roster,
    phase: PhaseMachine<Step>,
    chains: Vec<Chain>,
    entries: Submissions<String>,
}

impl Pictionary {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    fn steps(&self) -> u8 {
        self.roster.len() as u8
    }

    /// The chain seat `seat` works on at `step`.
    pub fn chain_for(&self, seat: usize, step: u8) -> usize {
        let n = self.roster.len();
        (seat + n - (step as usize % n)) % n
    }

    fn open_step(&mut self, step: u8) -> Effects<Event, Timer> {
        self.entries = Submissions::new(self.roster.ids());
        let task = Task::for_step(step);
        let mut fx = Effects::none();
        fx.broadcast(Event::StepStarted {
            step,
            steps: self.steps(),
            task,
        });
        for (seat, player) in self.roster.ids().enumerate() {
            let chain = self.chain_for(seat, step);
            fx.send_to(
                player,
                Event::YourTurn {
                    step,
                    task,
                    previous: self.chains[chain].entries.last().cloned(),
                },
            );
        }
        fx
    }

    fn complete_step(&mut self, step: u8) -> Effects<Event, Timer> {
        let last = step + 1 >= self.steps();
        let next = if last { Step::Reveal } else { Step::Working(step + 1) };
        if self.phase.advance(Step::Working(step), next).is_err() {
            return Effects::none();
        }

        let task = Task::for_step(step);
        let ids: Vec<PlayerId> = self.roster.ids().collect();
        for (seat, player) in ids.into_iter().enumerate() {
            let chain = self.chain_for(seat, step);
            let content = self.entries.get(player).cloned().unwrap_or_default();
            self.chains[chain].entries.push(Entry {
                author: player,
                task,
                content,
            });
        }

        if last {
            let mut fx = Effects::none();
            fx.broadcast(Event::Reveal {
                chains: self.chains.clone(),
            });
            fx
        } else {
            self.open_step(step + 1)
        }
    }
}

impl Rules for Pictionary {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn start(seats: &[Seat], _rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut game = Pictionary {
            phase: PhaseMachine::new(Step::Working(0)),
            chains: roster
                .ids()
                .map(|owner| Chain {
                    owner,
                    entries: Vec::new(),
                })
                .collect(),
            entries: Submissions::default(),
            roster,
        };
        let fx = game.open_step(0);
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        let Action::Submit { content } = action;
        let Step::Working(step) = self.phase.current() else {
            return Ok(Effects::none());
        };
        let content = match Task::for_step(step) {
            Task::Draw => {
                if content.is_empty() {
                    return Err(ActionError::new("Drawing cannot be empty"));
                }
                if content.len() > MAX_DRAWING_LEN {
                    return Err(ActionError::new("Drawing is too large"));
                }
                content
            }
            Task::Prompt => clean_text(&content, "Prompt")?,
            Task::Describe => clean_text(&content, "Description")?,
        };
        self.entries.submit(sender, content)?;

        let mut fx = Effects::none();
        fx.broadcast(Event::Submitted { player: sender });
        if self.entries.is_complete() {
            fx.append(self.complete_step(step));
        }
        Ok(fx)
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {}
    }

    fn is_finished(&self) -> bool {
        self.phase.is(Step::Reveal)
    }
}
