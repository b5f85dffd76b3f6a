//! Doodle Duel: two players draw the same prompt and the rest of the table
//! picks the better drawing.
//!
//! One round per seat; round `r` pits seats `r - 1` and `r` against each
//! other. Drawing closes when both duelists submit or after
//! [`DRAW_TIME`]. Each vote is worth
//! [`VOTE_POINTS`](crate::scoring::VOTE_POINTS) to the duelist.

use std::time::Duration;

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, Seat, Submissions};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::content::DOODLE_PROMPTS;
use crate::pictionary::MAX_DRAWING_LEN;
use crate::rules::{NEXT_ROUND_DELAY, Roster, Rules, Scoreboard, Standing, deal};
use crate::scoring::{tally, vote_points};

pub const DRAW_TIME: Duration = Duration::from_secs(90);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Duelists only.
    Draw { drawing: String },
    /// Everyone but the duelists.
    Vote { duelist: PlayerId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drawing {
    pub duelist: PlayerId,
    pub drawing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelTally {
    pub duelist: PlayerId,
    pub votes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    RoundStarted {
        round: u32,
        rounds: u32,
        duelists: [PlayerId; 2],
        prompt: String,
        seconds: u64,
    },
    VotingStarted { drawings: Vec<Drawing> },
    RoundResults {
        tally: Vec<DuelTally>,
        scores: Vec<Standing>,
    },
    GameOver { scores: Vec<Standing> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    DrawTimeout(u32),
    NextRound(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Drawing,
    Voting,
    Results,
    Ended,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Drawing, Step::Voting)
                | (Step::Voting, Step::Results)
                | (Step::Results, Step::Drawing)
                | (Step::Results, Step::Ended)
        )
    }
}

#[derive(Debug)]
pub struct DoodleDuel {
    roster: Roster,
    phase: PhaseMachine<Step>,
    round: u32,
    prompts: Vec<&'static str>,
    drawings: Submissions<String>,
    votes: Submissions<PlayerId>,
    scores: Scoreboard,
}

impl DoodleDuel {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn rounds(&self) -> u32 {
        self.roster.len() as u32
    }

    pub fn duelists(&self) -> [PlayerId; 2] {
        let first = self.round.saturating_sub(1) as usize;
        [self.roster.at(first), self.roster.at(first + 1)]
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    fn deal_round(&mut self) -> Effects<Event, Timer> {
        self.round += 1;
        let duelists = self.duelists();
        self.drawings = Submissions::new(duelists);
        self.votes = Submissions::new(self.roster.ids().filter(|p| !duelists.contains(p)));
        let prompt = self.prompts[(self.round as usize - 1) % self.prompts.len()];

        let mut fx = Effects::none();
        fx.broadcast(Event::RoundStarted {
            round: self.round,
            rounds: self.rounds(),
            duelists,
            prompt: prompt.to_string(),
            seconds: DRAW_TIME.as_secs(),
        })
        .schedule(Timer::DrawTimeout(self.round), DRAW_TIME);
        fx
    }

    fn open_voting(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Drawing, Step::Voting).is_err() {
            return Effects::none();
        }
        let drawings = self
            .duelists()
            .into_iter()
            .map(|duelist| Drawing {
                duelist,
                drawing: self.drawings.get(duelist).cloned(),
            })
            .collect();
        let mut fx = Effects::none();
        fx.cancel(Timer::DrawTimeout(self.round))
            .broadcast(Event::VotingStarted { drawings });
        fx
    }

    fn resolve(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Voting, Step::Results).is_err() {
            return Effects::none();
        }
        let counts = tally(self.votes.entries());
        for (duelist, points) in vote_points(self.votes.entries()) {
            self.scores.add(duelist, points);
        }
        let tally = self
            .duelists()
            .into_iter()
            .map(|duelist| DuelTally {
                duelist,
                votes: counts.get(&duelist).copied().unwrap_or(0),
            })
            .collect();

        let mut fx = Effects::none();
        fx.broadcast(Event::RoundResults {
            tally,
            scores: self.scores.standings(),
        });
        if self.round >= self.rounds() {
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

impl Rules for DoodleDuel {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut game = DoodleDuel {
            phase: PhaseMachine::new(Step::Drawing),
            round: 0,
            prompts: deal(DOODLE_PROMPTS, roster.len(), rng),
            drawings: Submissions::default(),
            votes: Submissions::default(),
            scores: Scoreboard::new(&roster),
            roster,
        };
        let fx = game.deal_round();
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        match action {
            Action::Draw { drawing } => {
                if !self.phase.is(Step::Drawing) {
                    return Ok(Effects::none());
                }
                if drawing.is_empty() || drawing.len() > MAX_DRAWING_LEN {
                    return Err(ActionError::new("Drawing is empty or too large"));
                }
                self.drawings
                    .submit(sender, drawing)
                    .map_err(|_| ActionError::new("Only the duelists draw this round"))?;
                Ok(if self.drawings.is_complete() {
                    self.open_voting()
                } else {
                    Effects::none()
                })
            }
            Action::Vote { duelist } => {
                if !self.phase.is(Step::Voting) {
                    return Ok(Effects::none());
                }
                if !self.duelists().contains(&duelist) {
                    return Err(ActionError::new("Vote for one of the duelists"));
                }
                self.votes
                    .submit(sender, duelist)
                    .map_err(|_| ActionError::new("Duelists cannot vote"))?;
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
            Timer::DrawTimeout(round) if round == self.round => self.open_voting(),
            Timer::NextRound(round) if round == self.round => {
                if self.phase.advance(Step::Results, Step::Drawing).is_err() {
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

    fn seats(n: u64) -> Vec<Seat> {
        (1..=n).map(|i| Seat::new(PlayerId(i), format!("P{i}"))).collect()
    }

    #[test]
    fn test_duel_round_scores_votes() {
        let mut rng = StdRng::seed_from_u64(5);
        let (mut game, _) = DoodleDuel::start(&seats(4), &mut rng);
        assert_eq!(game.duelists(), [PlayerId(1), PlayerId(2)]);

        game.handle(PlayerId(1), Action::Draw { drawing: "a".into() }, &mut rng).unwrap();
        assert!(game.handle(PlayerId(3), Action::Draw { drawing: "c".into() }, &mut rng).is_err());
        game.handle(PlayerId(2), Action::Draw { drawing: "b".into() }, &mut rng).unwrap();
        assert_eq!(game.phase(), Step::Voting);

        assert!(game.handle(PlayerId(1), Action::Vote { duelist: PlayerId(2) }, &mut rng).is_err());
        game.handle(PlayerId(3), Action::Vote { duelist: PlayerId(2) }, &mut rng).unwrap();
        game.handle(PlayerId(4), Action::Vote { duelist: PlayerId(2) }, &mut rng).unwrap();
        assert_eq!(game.phase(), Step::Results);
        assert_eq!(game.scores().get(PlayerId(2)), 2 * VOTE_POINTS);

        game.on_timer(Timer::NextRound(1), &mut rng);
        assert_eq!(game.duelists(), [PlayerId(2), PlayerId(3)]);
    }

    #[test]
    fn test_draw_timeout_for_old_round_is_ignored() {
        let mut rng = StdRng::seed_from_u64(5);
        let (mut game, _) = DoodleDuel::start(&seats(3), &mut rng);
        assert!(game.on_timer(Timer::DrawTimeout(7), &mut rng).is_empty());
        assert!(!game.on_timer(Timer::DrawTimeout(1), &mut rng).is_empty());
        assert!(game.on_timer(Timer::DrawTimeout(1), &mut rng).is_empty());
    }
}
