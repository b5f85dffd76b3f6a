//! # huddle-games
//!
//! The fifteen Huddle party games and their scoring resolvers.
//!
//! Each game lives in its own module and implements [`Rules`]: a phase
//! enum with an explicit transition table, per-phase [`Submissions`]
//! collected from the expected players, and a resolver that runs exactly
//! once per phase. [`Party`] wraps all of them in one
//! [`GameLogic`](huddle_room::GameLogic) so a single server can host any
//! game.
//!
//! On the wire a game action or event is tagged with its game:
//!
//! ```json
//! {"event": "game", "data": {"game": "avalon", "action": {"type": "vote", "approve": true}}}
//! ```
//!
//! [`Submissions`]: huddle_room::Submissions

pub mod avalon;
pub mod bet_or_bluff;
pub mod content;
pub mod doodle_duel;
pub mod fishbowl;
pub mod hot_takes;
pub mod imposter;
pub mod insider;
pub mod never_ever;
pub mod npat;
pub mod pictionary;
pub mod punchline;
pub mod rules;
pub mod scoring;
pub mod this_or_that;
pub mod trivia;
pub mod two_truths;
pub mod wavelength;

use huddle_protocol::{GameKind, PlayerId};
use huddle_room::{ActionError, ActionResult, Effects, GameLogic, PlayerLimits, Seat};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

pub use rules::{Roster, Rules, Scoreboard, Standing};

macro_rules! party {
    ($($kind:ident => $module:ident :: $game:ident),+ $(,)?) => {
        /// A running game of any kind.
        #[derive(Debug)]
        pub enum Party {
            $($kind($module::$game),)+
        }

        /// A client action for whichever game is running.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(tag = "game", content = "action", rename_all = "kebab-case")]
        pub enum GameAction {
            $($kind($module::Action),)+
        }

        /// A game event for clients, tagged with its game.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "game", content = "event", rename_all = "kebab-case")]
        pub enum GameEvent {
            $($kind($module::Event),)+
        }

        /// Timer key of whichever game is running.
        #[derive(Debug, Clone, PartialEq)]
        pub enum PartyTimer {
            $($kind($module::Timer),)+
        }

        impl Party {
            pub fn kind(&self) -> GameKind {
                match self {
                    $(Party::$kind(_) => GameKind::$kind,)+
                }
            }
        }

        impl GameLogic for Party {
            type Action = GameAction;
            type Event = GameEvent;
            type Timer = PartyTimer;

            fn limits(kind: GameKind) -> PlayerLimits {
                match kind {
                    $(GameKind::$kind => <$module::$game as Rules>::limits(),)+
                }
            }

            fn start(kind: GameKind, seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<GameEvent, PartyTimer>) {
                match kind {
                    $(GameKind::$kind => {
                        let (game, fx) = <$module::$game as Rules>::start(seats, rng);
                        (Party::$kind(game), fx.map(GameEvent::$kind, PartyTimer::$kind))
                    })+
                }
            }

            fn handle_action(
                &mut self,
                sender: PlayerId,
                action: GameAction,
                rng: &mut StdRng,
            ) -> ActionResult<GameEvent, PartyTimer> {
                match (self, action) {
                    $((Party::$kind(game), GameAction::$kind(action)) => game
                        .handle(sender, action, rng)
                        .map(|fx| fx.map(GameEvent::$kind, PartyTimer::$kind)),)+
                    (party, action) => {
                        tracing::debug!(game = %party.kind(), %sender, ?action, "action for another game");
                        Err(ActionError::new("That action is for a different game"))
                    }
                }
            }

            fn on_timer(&mut self, timer: PartyTimer, rng: &mut StdRng) -> Effects<GameEvent, PartyTimer> {
                match (self, timer) {
                    $((Party::$kind(game), PartyTimer::$kind(timer)) => game
                        .on_timer(timer, rng)
                        .map(GameEvent::$kind, PartyTimer::$kind),)+
                    (party, timer) => {
                        tracing::warn!(game = %party.kind(), ?timer, "timer for another game");
                        Effects::none()
                    }
                }
            }

            fn is_finished(&self) -> bool {
                match self {
                    $(Party::$kind(game) => game.is_finished(),)+
                }
            }
        }
    };
}

party! {
    Avalon => avalon::Avalon,
    Imposter => imposter::Imposter,
    Insider => insider::Insider,
    Wavelength => wavelength::Wavelength,
    Npat => npat::Npat,
    Punchline => punchline::Punchline,
    BrokenPictionary => pictionary::Pictionary,
    DoodleDuel => doodle_duel::DoodleDuel,
    TwoTruths => two_truths::TwoTruths,
    Fishbowl => fishbowl::Fishbowl,
    TriviaRoyale => trivia::Trivia,
    ThisOrThat => this_or_that::ThisOrThat,
    HotTakes => hot_takes::HotTakes,
    NeverEver => never_ever::NeverEver,
    BetOrBluff => bet_or_bluff::BetOrBluff,
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_limits_per_kind() {
        assert_eq!(Party::limits(GameKind::Avalon), PlayerLimits::new(5, 15));
        assert_eq!(Party::limits(GameKind::Insider), PlayerLimits::new(4, 8));
        assert_eq!(Party::limits(GameKind::Wavelength), PlayerLimits::new(4, 12));
        assert_eq!(Party::limits(GameKind::Fishbowl), PlayerLimits::new(4, 16));
        assert_eq!(Party::limits(GameKind::Npat), PlayerLimits::GENERIC);
    }

    #[test]
    fn test_every_kind_starts() {
        let seats: Vec<Seat> = (1..=6).map(|i| Seat::new(PlayerId(i), format!("P{i}"))).collect();
        for kind in GameKind::ALL {
            let mut rng = StdRng::seed_from_u64(11);
            let (party, _) = Party::start(kind, &seats, &mut rng);
            assert_eq!(party.kind(), kind);
            assert!(!party.is_finished(), "{kind} finished at deal");
        }
    }

    #[test]
    fn test_action_for_other_game_is_rejected() {
        let seats: Vec<Seat> = (1..=3).map(|i| Seat::new(PlayerId(i), format!("P{i}"))).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let (mut party, _) = Party::start(GameKind::HotTakes, &seats, &mut rng);
        let action = GameAction::NeverEver(never_ever::Action::Answer { have: true });
        let err = party.handle_action(PlayerId(1), action, &mut rng).unwrap_err();
        assert_eq!(err.0, "That action is for a different game");
    }

    #[test]
    fn test_game_action_wire_format() {
        let action: GameAction =
            serde_json::from_value(json!({"game": "avalon", "action": {"type": "vote", "approve": true}}))
                .unwrap();
        assert_eq!(action, GameAction::Avalon(avalon::Action::Vote { approve: true }));

        let action: GameAction = serde_json::from_value(
            json!({"game": "trivia-royale", "action": {"type": "answer", "choice": 2}}),
        )
        .unwrap();
        assert_eq!(action, GameAction::TriviaRoyale(trivia::Action::Answer { choice: 2 }));
    }

    #[test]
    fn test_game_event_wire_format() {
        let event = GameEvent::Insider(insider::Event::VotingStarted);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"game": "insider", "event": {"type": "voting-started"}})
        );
    }
}
