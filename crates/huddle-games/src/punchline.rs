//! Punchline: everyone finishes the same setup, then votes for the
//! funniest anonymous answer.

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, Seat, Submissions};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::content::PUNCHLINE_PROMPTS;
use crate::rules::{NEXT_ROUND_DELAY, Roster, Rules, Scoreboard, Standing, clean_text, deal};
use crate::scoring::{tally, vote_points};

pub const ROUNDS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Write { text: String },
    /// Vote by position in the `voting-started` list.
    Vote { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineResult {
    pub author: PlayerId,
    pub text: String,
    pub votes: u32,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    RoundStarted { round: u32, rounds: u32, prompt: String },
    VotingStarted { lines: Vec<String> },
    RoundResults {
        lines: Vec<LineResult>,
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
    Writing,
    Voting,
    Results,
    Ended,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Writing, Step::Voting)
                | (Step::Voting, Step::Results)
                | (Step::Results, Step::Writing)
                | (Step::Results, Step::Ended)
        )
    }
}

#[derive(Debug)]
pub struct Punchline {
    roster: Roster,
    phase: PhaseMachine<Step>,
    round: u32,
    prompts: Vec<&'static str>,
    lines: Submissions<String>,
    /// Authors in the shuffled order shown to voters.
    ballot: Vec<PlayerId>,
    votes: Submissions<PlayerId>,
    scores: Scoreboard,
}

impl Punchline {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Author of each line on the ballot, in display order.
    pub fn ballot(&self) -> &[PlayerId] {
        &self.ballot
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    fn deal_round(&mut self) -> Effects<Event, Timer> {
        self.round += 1;
        self.lines = Submissions::new(self.roster.ids());
        self.votes = Submissions::new(self.roster.ids());
        self.ballot.clear();
        let prompt = self.prompts[(self.round as usize - 1) % self.prompts.len()];

        let mut fx = Effects::none();
        fx.broadcast(Event::RoundStarted {
            round: self.round,
            rounds: ROUNDS,
            prompt: prompt.to_string(),
        });
        fx
    }

    fn open_voting(&mut self, rng: &mut StdRng) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Writing, Step::Voting).is_err() {
            return Effects::none();
        }
        self.ballot = self.lines.iter().map(|(author, _)| author).collect();
        self.ballot.shuffle(rng);
        let lines = self
            .ballot
            .iter()
            .filter_map(|author| self.lines.get(*author).cloned())
            .collect();

        let mut fx = Effects::none();
        fx.broadcast(Event::VotingStarted { lines });
        fx
    }

    fn resolve(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Voting, Step::Results).is_err() {
            return Effects::none();
        }
        let counts = tally(self.votes.entries());
        let points = vote_points(self.votes.entries());
        let mut lines = Vec::with_capacity(self.ballot.len());
        for author in &self.ballot {
            let earned = points.get(author).copied().unwrap_or(0);
            self.scores.add(*author, earned);
            lines.push(LineResult {
                author: *author,
                text: self.lines.get(*author).cloned().unwrap_or_default(),
                votes: counts.get(author).copied().unwrap_or(0),
                points: earned,
            });
        }

        let mut fx = Effects::none();
        fx.broadcast(Event::RoundResults {
            lines,
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

impl Rules for Punchline {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut game = Punchline {
            phase: PhaseMachine::new(Step::Writing),
            round: 0,
            prompts: deal(PUNCHLINE_PROMPTS, ROUNDS as usize, rng),
            lines: Submissions::default(),
            ballot: Vec::new(),
            votes: Submissions::default(),
            scores: Scoreboard::new(&roster),
            roster,
        };
        let fx = game.deal_round();
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, rng: &mut StdRng) -> ActionResult<Event, Timer> {
        match action {
            Action::Write { text } => {
                if !self.phase.is(Step::Writing) {
                    return Ok(Effects::none());
                }
                let text = clean_text(&text, "Punchline")?;
                self.lines.submit(sender, text)?;
                Ok(if self.lines.is_complete() {
                    self.open_voting(rng)
                } else {
                    Effects::none()
                })
            }
            Action::Vote { line } => {
                if !self.phase.is(Step::Voting) {
                    return Ok(Effects::none());
                }
                let Some(author) = self.ballot.get(line).copied() else {
                    return Err(ActionError::new("No such line"));
                };
                if author == sender {
                    return Err(ActionError::new("You cannot vote for your own line"));
                }
                self.votes.submit(sender, author)?;
                Ok(if self.votes.is_complete() {
                    self.resolve()
                } else {
                    Effects::none()
                })
            }
        }
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {
            Timer::NextRound(round) if round == self.round => {
                if self.phase.advance(Step::Results, Step::Writing).is_err() {
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
    use crate::scoring::VOTE_POINTS;

    #[test]
    fn test_votes_follow_the_shuffled_ballot() {
        let mut rng = StdRng::seed_from_u64(21);
        let seats: Vec<Seat> = (1..=3).map(|i| Seat::new(PlayerId(i), format!("P{i}"))).collect();
        let (mut game, _) = Punchline::start(&seats, &mut rng);
        for id in 1..=2 {
            game.handle(PlayerId(id), Action::Write { text: format!("line {id}") }, &mut rng)
                .unwrap();
        }
        let fx = game
            .handle(PlayerId(3), Action::Write { text: "line 3".into() }, &mut rng)
            .unwrap();
        assert_eq!(game.phase(), Step::Voting);
        let shown = fx.messages().iter().find_map(|(_, e)| match e {
            Event::VotingStarted { lines } => Some(lines.clone()),
            _ => None,
        });
        let expected: Vec<String> = game.ballot().iter().map(|a| format!("line {}", a.0)).collect();
        assert_eq!(shown, Some(expected));

        let line_of = |game: &Punchline, author: u64| {
            game.ballot().iter().position(|a| *a == PlayerId(author)).unwrap()
        };
        let own = line_of(&game, 1);
        assert_eq!(
            game.handle(PlayerId(1), Action::Vote { line: own }, &mut rng).unwrap_err(),
            ActionError::new("You cannot vote for your own line")
        );
        assert_eq!(
            game.handle(PlayerId(1), Action::Vote { line: 3 }, &mut rng).unwrap_err(),
            ActionError::new("No such line")
        );

        let to_p2 = line_of(&game, 2);
        let to_p1 = line_of(&game, 1);
        game.handle(PlayerId(1), Action::Vote { line: to_p2 }, &mut rng).unwrap();
        game.handle(PlayerId(2), Action::Vote { line: to_p1 }, &mut rng).unwrap();
        game.handle(PlayerId(3), Action::Vote { line: to_p1 }, &mut rng).unwrap();

        assert_eq!(game.phase(), Step::Results);
        assert_eq!(game.scores().get(PlayerId(1)), 2 * VOTE_POINTS);
        assert_eq!(game.scores().get(PlayerId(2)), VOTE_POINTS);
        assert_eq!(game.scores().get(PlayerId(3)), 0);
    }
}
