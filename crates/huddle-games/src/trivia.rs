//! Trivia Royale: multiple choice with lives.
//!
//! Every question is answered by the players still alive. A wrong or
//! missing answer costs a life; the game ends when at most one player is
//! left standing or the questions run out.

use std::collections::BTreeMap;
use std::time::Duration;

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, Seat, Submissions};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::content::{TRIVIA, TriviaCard};
use crate::rules::{NEXT_ROUND_DELAY, Roster, Rules, Scoreboard, Standing, deal};

pub const QUESTIONS: usize = 10;
pub const LIVES: u8 = 3;
pub const ANSWER_TIME: Duration = Duration::from_secs(20);
pub const CORRECT_ANSWER: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Answer { choice: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub player: PlayerId,
    pub choice: Option<u8>,
    pub correct: bool,
    pub lives: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    Question {
        number: usize,
        total: usize,
        question: String,
        choices: Vec<String>,
        seconds: u64,
        alive: Vec<PlayerId>,
    },
    Answered { player: PlayerId },
    Reveal {
        answer: u8,
        results: Vec<AnswerResult>,
        eliminated: Vec<PlayerId>,
        scores: Vec<Standing>,
    },
    GameOver {
        winners: Vec<PlayerId>,
        scores: Vec<Standing>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    QuestionTimeout(usize),
    NextQuestion(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Question,
    Reveal,
    Ended,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Question, Step::Reveal) | (Step::Reveal, Step::Question) | (Step::Reveal, Step::Ended)
        )
    }
}

#[derive(Debug)]
pub struct Trivia {
    roster: Roster,
    phase: PhaseMachine<Step>,
    deck: Vec<TriviaCard>,
    /// 1-based number of the question in play.
    number: usize,
    lives: BTreeMap<PlayerId, u8>,
    answers: Submissions<u8>,
    scores: Scoreboard,
    winners: Vec<PlayerId>,
}

impl Trivia {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn lives(&self, player: PlayerId) -> u8 {
        self.lives.get(&player).copied().unwrap_or(0)
    }

    /// Players with lives left, in seating order.
    pub fn alive(&self) -> Vec<PlayerId> {
        self.roster.ids().filter(|p| self.lives(*p) > 0).collect()
    }

    pub fn card(&self) -> Option<&TriviaCard> {
        self.number.checked_sub(1).and_then(|i| self.deck.get(i))
    }

    pub fn winners(&self) -> &[PlayerId] {
        &self.winners
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    fn ask(&mut self) -> Effects<Event, Timer> {
        self.number += 1;
        let alive = self.alive();
        self.answers = Submissions::new(alive.iter().copied());
        let mut fx = Effects::none();
        if let Some(card) = self.card() {
            fx.broadcast(Event::Question {
                number: self.number,
                total: self.deck.len(),
                question: card.question.to_string(),
                choices: card.choices.iter().map(|c| c.to_string()).collect(),
                seconds: ANSWER_TIME.as_secs(),
                alive,
            });
        }
        fx.schedule(Timer::QuestionTimeout(self.number), ANSWER_TIME);
        fx
    }

    fn resolve(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Question, Step::Reveal).is_err() {
            return Effects::none();
        }
        let Some(answer) = self.card().map(|c| c.answer) else {
            return Effects::none();
        };

        let mut results = Vec::new();
        let mut eliminated = Vec::new();
        for player in self.alive() {
            let choice = self.answers.get(player).copied();
            let correct = choice == Some(answer);
            if correct {
                self.scores.add(player, CORRECT_ANSWER);
            } else if let Some(lives) = self.lives.get_mut(&player) {
                *lives = lives.saturating_sub(1);
                if *lives == 0 {
                    eliminated.push(player);
                }
            }
            results.push(AnswerResult {
                player,
                choice,
                correct,
                lives: self.lives(player),
            });
        }

        let mut fx = Effects::none();
        fx.cancel(Timer::QuestionTimeout(self.number))
            .broadcast(Event::Reveal {
                answer,
                results,
                eliminated,
                scores: self.scores.standings(),
            });

        let alive = self.alive();
        if alive.len() <= 1 || self.number >= self.deck.len() {
            let ended = self.phase.advance(Step::Reveal, Step::Ended);
            debug_assert!(ended.is_ok(), "{ended:?}");
            self.winners = if alive.len() == 1 {
                alive
            } else {
                self.scores.leaders()
            };
            fx.broadcast(Event::GameOver {
                winners: self.winners.clone(),
                scores: self.scores.standings(),
            });
        } else {
            fx.schedule(Timer::NextQuestion(self.number), NEXT_ROUND_DELAY);
        }
        fx
    }
}

impl Rules for Trivia {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut game = Trivia {
            phase: PhaseMachine::new(Step::Question),
            deck: deal(TRIVIA, QUESTIONS, rng),
            number: 0,
            lives: roster.ids().map(|p| (p, LIVES)).collect(),
            answers: Submissions::default(),
            scores: Scoreboard::new(&roster),
            winners: Vec::new(),
            roster,
        };
        let fx = game.ask();
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        let Action::Answer { choice } = action;
        if !self.phase.is(Step::Question) {
            return Ok(Effects::none());
        }
        if choice > 3 {
            return Err(ActionError::new("Choose an answer from 0 to 3"));
        }
        self.answers
            .submit(sender, choice)
            .map_err(|_| ActionError::new("You are out of lives"))?;

        let mut fx = Effects::none();
        fx.broadcast(Event::Answered { player: sender });
        if self.answers.is_complete() {
            fx.append(self.resolve());
        }
        Ok(fx)
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {
            Timer::QuestionTimeout(number) if number == self.number => self.resolve(),
            Timer::NextQuestion(number) if number == self.number => {
                if self.phase.advance(Step::Reveal, Step::Question).is_err() {
                    return Effects::none();
                }
                self.ask()
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

    fn game() -> (Trivia, StdRng) {
        let mut rng = StdRng::seed_from_u64(4);
        let seats: Vec<Seat> = (1..=3).map(|i| Seat::new(PlayerId(i), format!("P{i}"))).collect();
        let (game, _) = Trivia::start(&seats, &mut rng);
        (game, rng)
    }

    #[test]
    fn test_missing_answer_costs_a_life() {
        let (mut game, mut rng) = game();
        let answer = game.card().unwrap().answer;
        game.handle(PlayerId(1), Action::Answer { choice: answer }, &mut rng).unwrap();
        game.on_timer(Timer::QuestionTimeout(1), &mut rng);

        assert_eq!(game.lives(PlayerId(1)), LIVES);
        assert_eq!(game.lives(PlayerId(2)), LIVES - 1);
        assert_eq!(game.scores().get(PlayerId(1)), CORRECT_ANSWER);
        assert!(game.on_timer(Timer::QuestionTimeout(1), &mut rng).is_empty());
    }

    #[test]
    fn test_last_survivor_wins() {
        let (mut game, mut rng) = game();
        for number in 1..=LIVES as usize {
            let answer = game.card().unwrap().answer;
            game.handle(PlayerId(2), Action::Answer { choice: answer }, &mut rng).unwrap();
            game.on_timer(Timer::QuestionTimeout(number), &mut rng);
            game.on_timer(Timer::NextQuestion(number), &mut rng);
        }
        assert!(game.is_finished());
        assert_eq!(game.winners(), &[PlayerId(2)]);
        assert!(game.handle(PlayerId(1), Action::Answer { choice: 0 }, &mut rng).unwrap().is_empty());
    }
}
