//! Bet-or-Bluff: guess a number, then bet chips on whoever you think
//! guessed closest to the table's median.
//!
//! Each round is `guessing → betting → results`. Guessing and betting are
//! both timed; a missing guess counts as 0, a missing bet as no bet.

use std::collections::BTreeMap;
use std::time::Duration;

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, Seat, Submissions};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::content::ESTIMATES;
use crate::rules::{NEXT_ROUND_DELAY, Roster, Rules, deal};
use crate::scoring::{Payout, Wager, closest, median, settle};

pub const ROUNDS: u32 = 5;
pub const STARTING_BALANCE: u32 = 100;
pub const GUESS_TIME: Duration = Duration::from_secs(45);
pub const BET_TIME: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Guess { value: i64 },
    /// Back `on`; `amount` is capped at the backer's balance.
    Bet { on: PlayerId, amount: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberGuess {
    pub player: PlayerId,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub player: PlayerId,
    pub chips: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    RoundStarted {
        round: u32,
        rounds: u32,
        question: String,
        seconds: u64,
    },
    Guessed { player: PlayerId },
    BettingStarted { guesses: Vec<NumberGuess>, seconds: u64 },
    BetPlaced { player: PlayerId },
    RoundResults {
        target: f64,
        closest: PlayerId,
        payouts: Vec<Payout>,
    },
    GameOver {
        balances: Vec<Balance>,
        winners: Vec<PlayerId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    GuessTimeout(u32),
    BetTimeout(u32),
    NextRound(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Guessing,
    Betting,
    Results,
    Ended,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::Guessing, Step::Betting)
                | (Step::Betting, Step::Results)
                | (Step::Results, Step::Guessing)
                | (Step::Results, Step::Ended)
        )
    }
}

#[derive(Debug)]
pub struct BetOrBluff {
    roster: Roster,
    phase: PhaseMachine<Step>,
    round: u32,
    questions: Vec<&'static str>,
    guesses: Submissions<i64>,
    /// Every guess once betting opens, missing ones filled with 0.
    final_guesses: Vec<(PlayerId, i64)>,
    wagers: Submissions<Wager>,
    balances: BTreeMap<PlayerId, u32>,
}

impl BetOrBluff {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn balance(&self, player: PlayerId) -> u32 {
        self.balances.get(&player).copied().unwrap_or(0)
    }

    /// Players holding the most chips, in seating order.
    pub fn leaders(&self) -> Vec<PlayerId> {
        let best = self.balances.values().copied().max().unwrap_or(0);
        self.roster.ids().filter(|p| self.balance(*p) == best).collect()
    }

    fn deal_round(&mut self) -> Effects<Event, Timer> {
        self.round += 1;
        self.guesses = Submissions::new(self.roster.ids());
        self.wagers = Submissions::new(self.roster.ids());
        self.final_guesses.clear();
        let question = self.questions[(self.round as usize - 1) % self.questions.len()];

        let mut fx = Effects::none();
        fx.broadcast(Event::RoundStarted {
            round: self.round,
            rounds: ROUNDS,
            question: question.to_string(),
            seconds: GUESS_TIME.as_secs(),
        })
        .schedule(Timer::GuessTimeout(self.round), GUESS_TIME);
        fx
    }

    fn open_betting(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Guessing, Step::Betting).is_err() {
            return Effects::none();
        }
        self.final_guesses = self
            .roster
            .ids()
            .map(|player| (player, self.guesses.get(player).copied().unwrap_or(0)))
            .collect();

        let mut fx = Effects::none();
        fx.cancel(Timer::GuessTimeout(self.round))
            .broadcast(Event::BettingStarted {
                guesses: self
                    .final_guesses
                    .iter()
                    .map(|(player, value)| NumberGuess {
                        player: *player,
                        value: *value,
                    })
                    .collect(),
                seconds: BET_TIME.as_secs(),
            })
            .schedule(Timer::BetTimeout(self.round), BET_TIME);
        fx
    }

    fn resolve(&mut self) -> Effects<Event, Timer> {
        if self.phase.advance(Step::Betting, Step::Results).is_err() {
            return Effects::none();
        }
        let values: Vec<i64> = self.final_guesses.iter().map(|(_, v)| *v).collect();
        let target = median(&values).unwrap_or(0.0);
        let winner = closest(&self.final_guesses, target).unwrap_or_else(|| self.roster.at(0));

        let payouts = settle(&self.balances, self.wagers.entries(), winner);
        for payout in &payouts {
            self.balances.insert(payout.player, payout.balance);
        }

        let mut fx = Effects::none();
        fx.cancel(Timer::BetTimeout(self.round))
            .broadcast(Event::RoundResults {
                target,
                closest: winner,
                payouts,
            });
        if self.round >= ROUNDS {
            let ended = self.phase.advance(Step::Results, Step::Ended);
            debug_assert!(ended.is_ok(), "{ended:?}");
            fx.broadcast(Event::GameOver {
                balances: self
                    .roster
                    .ids()
                    .map(|player| Balance {
                        player,
                        chips: self.balance(player),
                    })
                    .collect(),
                winners: self.leaders(),
            });
        } else {
            fx.schedule(Timer::NextRound(self.round), NEXT_ROUND_DELAY);
        }
        fx
    }
}

impl Rules for BetOrBluff {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let mut game = BetOrBluff {
            phase: PhaseMachine::new(Step::Guessing),
            round: 0,
            questions: deal(ESTIMATES, ROUNDS as usize, rng),
            guesses: Submissions::default(),
            final_guesses: Vec::new(),
            wagers: Submissions::default(),
            balances: roster.ids().map(|p| (p, STARTING_BALANCE)).collect(),
            roster,
        };
        let fx = game.deal_round();
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        match action {
            Action::Guess { value } => {
                if !self.phase.is(Step::Guessing) {
                    return Ok(Effects::none());
                }
                self.guesses.submit(sender, value)?;
                let mut fx = Effects::none();
                fx.broadcast(Event::Guessed { player: sender });
                if self.guesses.is_complete() {
                    fx.append(self.open_betting());
                }
                Ok(fx)
            }
            Action::Bet { on, amount } => {
                if !self.phase.is(Step::Betting) {
                    return Ok(Effects::none());
                }
                self.roster.require(on)?;
                let amount = amount.min(self.balance(sender));
                if amount == 0 {
                    return Err(ActionError::new("You have no chips to bet"));
                }
                self.wagers.submit(sender, Wager { on, amount })?;
                let mut fx = Effects::none();
                fx.broadcast(Event::BetPlaced { player: sender });
                if self.wagers.is_complete() {
                    fx.append(self.resolve());
                }
                Ok(fx)
            }
        }
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {
            Timer::GuessTimeout(round) if round == self.round => self.open_betting(),
            Timer::BetTimeout(round) if round == self.round => self.resolve(),
            Timer::NextRound(round) if round == self.round => {
                if self.phase.advance(Step::Results, Step::Guessing).is_err() {
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
    use huddle_room::TimerOp;
    use rand::SeedableRng;

    use super::*;
    use crate::scoring::CLOSEST_BONUS;

    fn table(n: u64) -> (BetOrBluff, StdRng) {
        let mut rng = StdRng::seed_from_u64(5);
        let seats: Vec<Seat> = (1..=n).map(|i| Seat::new(PlayerId(i), format!("P{i}"))).collect();
        let (game, _) = BetOrBluff::start(&seats, &mut rng);
        (game, rng)
    }

    #[test]
    fn test_guess_timeout_fills_missing_guesses_with_zero() {
        let (mut game, mut rng) = table(3);
        game.handle(PlayerId(2), Action::Guess { value: 7 }, &mut rng).unwrap();

        assert!(game.on_timer(Timer::GuessTimeout(0), &mut rng).is_empty());
        assert_eq!(game.phase(), Step::Guessing);

        let fx = game.on_timer(Timer::GuessTimeout(1), &mut rng);
        assert_eq!(game.phase(), Step::Betting);
        let guesses = fx.messages().iter().find_map(|(_, e)| match e {
            Event::BettingStarted { guesses, seconds } => Some((guesses.clone(), *seconds)),
            _ => None,
        });
        let (guesses, seconds) = guesses.unwrap();
        assert_eq!(seconds, BET_TIME.as_secs());
        assert_eq!(
            guesses.iter().map(|g| (g.player, g.value)).collect::<Vec<_>>(),
            vec![(PlayerId(1), 0), (PlayerId(2), 7), (PlayerId(3), 0)]
        );
        assert!(fx.timers().contains(&TimerOp::Schedule {
            timer: Timer::BetTimeout(1),
            after: BET_TIME,
        }));

        // late guesses are ignored once betting is open
        assert!(game.handle(PlayerId(1), Action::Guess { value: 99 }, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_bets_are_capped_and_an_empty_stack_cannot_bet() {
        let (mut game, mut rng) = table(3);
        for (id, value) in [(1, 10), (2, 20), (3, 100)] {
            game.handle(PlayerId(id), Action::Guess { value }, &mut rng).unwrap();
        }
        game.handle(PlayerId(1), Action::Bet { on: PlayerId(3), amount: 500 }, &mut rng)
            .unwrap();
        game.handle(PlayerId(2), Action::Bet { on: PlayerId(2), amount: 10 }, &mut rng)
            .unwrap();
        let fx = game
            .handle(PlayerId(3), Action::Bet { on: PlayerId(2), amount: 10 }, &mut rng)
            .unwrap();
        assert_eq!(game.phase(), Step::Results);

        let lost = fx.messages().iter().find_map(|(_, e)| match e {
            Event::RoundResults { payouts, .. } => payouts.iter().find(|p| p.player == PlayerId(1)).map(|p| p.delta),
            _ => None,
        });
        assert_eq!(lost, Some(-i64::from(STARTING_BALANCE)));
        assert_eq!(game.balance(PlayerId(1)), 0);
        assert_eq!(game.balance(PlayerId(2)), STARTING_BALANCE + 10 + CLOSEST_BONUS);
        assert_eq!(game.balance(PlayerId(3)), STARTING_BALANCE + 10);

        game.on_timer(Timer::NextRound(1), &mut rng);
        assert_eq!(game.round(), 2);
        for id in 1..=3 {
            game.handle(PlayerId(id), Action::Guess { value: 50 }, &mut rng).unwrap();
        }
        let err = game
            .handle(PlayerId(1), Action::Bet { on: PlayerId(2), amount: 5 }, &mut rng)
            .unwrap_err();
        assert_eq!(err, ActionError::new("You have no chips to bet"));
    }
}
