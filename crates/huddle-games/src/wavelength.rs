//! Wavelength: a psychic steers the table toward a hidden point on a
//! spectrum with a single clue.
//!
//! One round per player, the psychic rotating by seat. Each round is
//! `clue → guessing → reveal`; guessing ends when every other player has
//! guessed or after [`GUESS_TIME`].

use std::time::Duration;

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, PlayerLimits, Seat, Submissions};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::content::SPECTRUMS;
use crate::rules::{NEXT_ROUND_DELAY, Roster, Rules, Scoreboard, Standing, clean_text, deal};
use crate::scoring::wavelength_points;

pub const GUESS_TIME: Duration = Duration::from_secs(60);
pub const DIAL_MAX: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Psychic only.
    Clue { text: String },
    Guess { value: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialGuess {
    pub player: PlayerId,
    pub value: u8,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    RoundStarted {
        round: u32,
        rounds: u32,
        psychic: PlayerId,
        left: String,
        right: String,
    },
    /// Private, to the psychic.
    Target { value: u8 },
    ClueGiven { clue: String, seconds: u64 },
    Reveal {
        target: u8,
        guesses: Vec<DialGuess>,
        psychic_points: u32,
        scores: Vec<Standing>,
    },
    GameOver { scores: Vec<Standing> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    GuessTimeout(u32),
    NextRound(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Clue,
    Guessing,
    Reveal,
    Ended,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Clue, Step::Guessing)
                | (Step::Guessing, Step::Reveal)
                | (Step::Reveal, Step::Clue)
                | (Step::Reveal, Step::Ended)
        )
    }
}

#[derive(Debug)]
pub struct Wavelength {
    roster: Roster,
    phase: PhaseMachine<Step>,
    round: u32,
    spectrums: Vec<(&'static str, &'static str)>,
    target: u8,
    guesses: Submissions<u8>,
    scores: Scoreboard,
}

impl Wavelength {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn rounds(&self) -> u32 {
        self.roster.len() as u32
    }

    pub fn psychic(&self) -> PlayerId {
        self.roster.at(self.round.saturating_sub(1) as usize)
    }

    pub fn target(&self) -> u8 {
        self.target
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    fn deal_round(&mut self, rng: &mut StdRng) -> Effects<Event, Timer> {
        self.round += 1;
        self.target = rng.random_range(0..=DIAL_MAX);
        let psychic = self.psychic();
        self.guesses = Submissions::new(self.roster.others(psychic));
        let (left, right) = self.spectrums[(self.round as usize - 1) % self.spectrums.len()];

        let mut fx = Effects::none();
        fx.broadcast(Event::RoundStarted {
            round: self.round,
            rounds: self.rounds(),
            psychic,
            left: left.to_string(),
            right: right.to_string(),
        })
        .send_to(psychic, Event::Target { value: self.target });
        fx
    }

    fn resolve(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Guessing, Step::Reveal).is_err() {
            return Effects::none();
        }
        let guesses: Vec<DialGuess> = self
            .guesses
            .iter()
            .map(|(player, value)| DialGuess {
                player,
                value: *value,
                points: wavelength_points(*value, self.target),
            })
            .collect();
        let psychic_points = guesses.iter().map(|g| g.points).max().unwrap_or(0);
        for guess in &guesses {
            self.scores.add(guess.player, guess.points);
        }
        self.scores.add(self.psychic(), psychic_points);

        let mut fx = Effects::none();
        fx.cancel(Timer::GuessTimeout(self.round))
            .broadcast(Event::Reveal {
                target: self.target,
                guesses,
                psychic_points,
                scores: self.scores.standings(),
            });

        if self.round >= self.rounds() {
            let ended = self.phase.advance(Step::Reveal, Step::Ended);
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

impl Rules for Wavelength {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn limits() -> PlayerLimits {
        PlayerLimits::new(4, 12)
    }

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut game = Wavelength {
            phase: PhaseMachine::new(Step::Clue),
            round: 0,
            spectrums: deal(SPECTRUMS, roster.len(), rng),
            target: 0,
            guesses: Submissions::default(),
            scores: Scoreboard::new(&roster),
            roster,
        };
        let fx = game.deal_round(rng);
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        match action {
            Action::Clue { text } => {
                if !self.phase.is(Step::Clue) {
                    return Ok(Effects::none());
                }
                if sender != self.psychic() {
                    return Err(ActionError::new("Only the psychic gives the clue"));
                }
                let clue = clean_text(&text, "Clue")?;
                if self.phase.advance(Step::Clue, Step::Guessing).is_err() {
                    return Ok(Effects::none());
                }
                let mut fx = Effects::none();
                fx.broadcast(Event::ClueGiven {
                    clue,
                    seconds: GUESS_TIME.as_secs(),
                })
                .schedule(Timer::GuessTimeout(self.round), GUESS_TIME);
                Ok(fx)
            }
            Action::Guess { value } => {
                if !self.phase.is(Step::Guessing) {
                    return Ok(Effects::none());
                }
                if value > DIAL_MAX {
                    return Err(ActionError::new(format!("Guess must be between 0 and {DIAL_MAX}")));
                }
                self.guesses.submit(sender, value)?;
                Ok(if self.guesses.is_complete() {
                    self.resolve()
                } else {
                    Effects::none()
                })
            }
        }
    }

    fn on_timer(&mut self, timer: Timer, rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {
            Timer::GuessTimeout(round) if round == self.round => self.resolve(),
            Timer::NextRound(round) if round == self.round => {
                if self.phase.advance(Step::Reveal, Step::Clue).is_err() {
                    return Effects::none();
                }
                self.deal_round(rng)
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
    fn test_timeout_reveals_with_the_guesses_in() {
        let mut rng = StdRng::seed_from_u64(3);
        let seats: Vec<Seat> = (1..=4).map(|i| Seat::new(PlayerId(i), format!("P{i}"))).collect();
        let (mut game, _) = Wavelength::start(&seats, &mut rng);
        assert_eq!(game.psychic(), PlayerId(1));
        assert_eq!(game.rounds(), 4);

        assert!(game.handle(PlayerId(2), Action::Guess { value: 10 }, &mut rng).unwrap().is_empty());
        assert_eq!(
            game.handle(PlayerId(2), Action::Clue { text: "warm".into() }, &mut rng).unwrap_err(),
            ActionError::new("Only the psychic gives the clue")
        );
        game.handle(PlayerId(1), Action::Clue { text: "warm".into() }, &mut rng).unwrap();
        assert_eq!(game.phase(), Step::Guessing);
        assert!(game.handle(PlayerId(2), Action::Guess { value: DIAL_MAX + 1 }, &mut rng).is_err());

        let target = game.target();
        let far = if target >= 50 { 0 } else { DIAL_MAX };
        game.handle(PlayerId(2), Action::Guess { value: target }, &mut rng).unwrap();
        game.handle(PlayerId(3), Action::Guess { value: far }, &mut rng).unwrap();
        assert_eq!(game.phase(), Step::Guessing);

        game.on_timer(Timer::GuessTimeout(1), &mut rng);
        assert_eq!(game.phase(), Step::Reveal);
        assert_eq!(game.scores().get(PlayerId(1)), 4);
        assert_eq!(game.scores().get(PlayerId(2)), 4);
        assert_eq!(game.scores().get(PlayerId(3)), 0);
        assert_eq!(game.scores().get(PlayerId(4)), 0);
        assert!(game.on_timer(Timer::GuessTimeout(1), &mut rng).is_empty());

        game.on_timer(Timer::NextRound(1), &mut rng);
        assert_eq!(game.phase(), Step::Clue);
        assert_eq!(game.psychic(), PlayerId(2));
    }
}
