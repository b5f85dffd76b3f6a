//! Game flows driven through the public `Rules` API with a seeded RNG.

use huddle_games::avalon::{self, Alignment, Avalon, QuestResult, Role};
use huddle_games::bet_or_bluff::{self, BetOrBluff};
use huddle_games::hot_takes::{self, HotTakes};
use huddle_games::imposter::{self, Imposter};
use huddle_games::insider::{self, Insider, Outcome};
use huddle_games::npat::{self, Npat, Sheet};
use huddle_games::punchline::{self, Punchline};
use huddle_games::this_or_that::{self, Pick, ThisOrThat};
use huddle_games::wavelength::{self, Wavelength};
use huddle_games::Rules;
use huddle_protocol::PlayerId;
use huddle_room::{Effects, Seat};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn pid(id: u64) -> PlayerId {
    PlayerId(id)
}

fn seats(n: u64) -> Vec<Seat> {
    (1..=n)
        .map(|i| Seat::new(pid(i), format!("P{i}")).with_host(i == 1))
        .collect()
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

fn events<E: Clone, T>(fx: &Effects<E, T>) -> Vec<E> {
    fx.messages().iter().map(|(_, e)| e.clone()).collect()
}

// =========================================================================
// Avalon
// =========================================================================

fn players(game: &Avalon, n: u64, alignment: Alignment) -> Vec<PlayerId> {
    (1..=n)
        .map(pid)
        .filter(|p| game.role_of(*p).map(Role::alignment) == Some(alignment))
        .collect()
}

/// Proposes `team`, has everyone approve and plays `fails` fail cards from
/// evil team members.
fn run_quest(game: &mut Avalon, rng: &mut StdRng, n: u64, team: Vec<PlayerId>, fails: usize) {
    let leader = game.leader();
    game.handle(leader, avalon::Action::Propose { team: team.clone() }, rng)
        .unwrap();
    for id in 1..=n {
        game.handle(pid(id), avalon::Action::Vote { approve: true }, rng)
            .unwrap();
    }
    assert_eq!(game.phase(), avalon::Step::Quest);

    let mut fails_left = fails;
    for member in team {
        let evil = game.role_of(member).map(Role::alignment) == Some(Alignment::Evil);
        let success = !(evil && fails_left > 0);
        if !success {
            fails_left -= 1;
        }
        game.handle(member, avalon::Action::Quest { success }, rng)
            .unwrap();
    }
}

#[test]
fn test_avalon_first_quest_success() {
    let mut rng = rng();
    let (mut game, fx) = Avalon::start(&seats(5), &mut rng);
    assert!(!fx.is_empty());
    assert_eq!(game.leader_index(), 0);

    let team: Vec<_> = players(&game, 5, Alignment::Good).into_iter().take(2).collect();
    run_quest(&mut game, &mut rng, 5, team, 0);

    assert_eq!(game.quest_results(), &[QuestResult::Success]);
    assert_eq!(game.current_quest(), 1);
    assert_eq!(game.leader_index(), 1);
    assert_eq!(game.phase(), avalon::Step::TeamSelect);
}

#[test]
fn test_avalon_five_rejections_hand_evil_the_game() {
    let mut rng = rng();
    let (mut game, _) = Avalon::start(&seats(5), &mut rng);

    let mut last = Effects::none();
    for round in 0..5 {
        assert_eq!(game.leader_index(), round);
        let leader = game.leader();
        let team = vec![pid(1), pid(2)];
        game.handle(leader, avalon::Action::Propose { team }, &mut rng)
            .unwrap();
        for id in 1..=5 {
            last = game
                .handle(pid(id), avalon::Action::Vote { approve: false }, &mut rng)
                .unwrap();
        }
    }

    assert!(game.is_finished());
    assert_eq!(game.winner(), Some(Alignment::Evil));
    let reason = events(&last).into_iter().find_map(|e| match e {
        avalon::Event::GameOver { reason, .. } => Some(reason),
        _ => None,
    });
    assert_eq!(reason.as_deref(), Some("Five team rejections"));
}

#[test]
fn test_avalon_fourth_quest_needs_two_fails_at_seven() {
    let mut rng = rng();
    let (mut game, _) = Avalon::start(&seats(7), &mut rng);
    let good = players(&game, 7, Alignment::Good);
    let evil = players(&game, 7, Alignment::Evil);
    assert_eq!(evil.len(), 3);

    // success, fail, success
    run_quest(&mut game, &mut rng, 7, good[..2].to_vec(), 0);
    run_quest(&mut game, &mut rng, 7, vec![evil[0], good[0], good[1]], 1);
    run_quest(&mut game, &mut rng, 7, good[..3].to_vec(), 0);
    assert_eq!(
        game.quest_results(),
        &[QuestResult::Success, QuestResult::Fail, QuestResult::Success]
    );

    // one fail card on the fourth quest is not enough
    run_quest(&mut game, &mut rng, 7, vec![evil[0], good[0], good[1], good[2]], 1);
    assert_eq!(game.quest_results()[3], QuestResult::Success);
    assert!(game.is_finished());
    assert_eq!(game.winner(), Some(Alignment::Good));
}

#[test]
fn test_avalon_merlin_blind_to_mordred() {
    let mut rng = rng();
    let (game, _) = Avalon::start(&seats(10), &mut rng);
    let find = |role: Role| (1..=10).map(pid).find(|p| game.role_of(*p) == Some(role));
    let merlin = find(Role::Merlin).unwrap();
    let mordred = find(Role::Mordred).unwrap();
    let assassin = find(Role::Assassin).unwrap();

    let seen = game.visible_to(merlin);
    assert!(!seen.contains(&mordred));
    assert!(seen.contains(&assassin));
    assert!(game.visible_to(mordred).contains(&assassin));
}

#[test]
fn test_avalon_stale_and_invalid_input() {
    let mut rng = rng();
    let (mut game, _) = Avalon::start(&seats(5), &mut rng);

    // votes before a proposal are dropped
    let fx = game
        .handle(pid(1), avalon::Action::Vote { approve: true }, &mut rng)
        .unwrap();
    assert!(fx.is_empty());

    let not_leader = (1..=5).map(pid).find(|p| *p != game.leader()).unwrap();
    let team = vec![pid(1), pid(2)];
    assert!(game
        .handle(not_leader, avalon::Action::Propose { team: team.clone() }, &mut rng)
        .is_err());
    assert!(game
        .handle(game.leader(), avalon::Action::Propose { team: vec![pid(1), pid(1)] }, &mut rng)
        .is_err());
    assert!(game
        .handle(game.leader(), avalon::Action::Propose { team: vec![pid(1), pid(9)] }, &mut rng)
        .is_err());

    game.handle(game.leader(), avalon::Action::Propose { team }, &mut rng)
        .unwrap();
    // a changed vote is not a second ballot
    game.handle(pid(1), avalon::Action::Vote { approve: false }, &mut rng)
        .unwrap();
    game.handle(pid(1), avalon::Action::Vote { approve: true }, &mut rng)
        .unwrap();
    assert_eq!(game.phase(), avalon::Step::TeamVote);

    let good = players(&game, 5, Alignment::Good);
    let evil = players(&game, 5, Alignment::Evil);
    for id in 2..=5 {
        game.handle(pid(id), avalon::Action::Vote { approve: true }, &mut rng)
            .unwrap();
    }
    assert_eq!(game.phase(), avalon::Step::Quest);

    let team = game.team().to_vec();
    if let Some(loyal) = good.iter().find(|p| team.contains(p)).copied() {
        let err = game
            .handle(loyal, avalon::Action::Quest { success: false }, &mut rng)
            .unwrap_err();
        assert_eq!(err.0, "Loyal players can only play success");
    }
    if let Some(outsider) = good.iter().chain(&evil).find(|p| !team.contains(p)).copied() {
        assert!(game
            .handle(outsider, avalon::Action::Quest { success: true }, &mut rng)
            .is_err());
    }
}

// =========================================================================
// Imposter
// =========================================================================

#[test]
fn test_imposter_round_and_host_deals_next() {
    let mut rng = rng();
    let (mut game, fx) = Imposter::start(&seats(4), &mut rng);
    let imposter = game.imposter();

    let private: Vec<_> = fx
        .messages()
        .iter()
        .filter(|(_, e)| matches!(e, imposter::Event::YouAreImposter))
        .collect();
    assert_eq!(private.len(), 1);

    for id in 1..=4 {
        game.handle(pid(id), imposter::Action::Clue { text: format!("clue {id}") }, &mut rng)
            .unwrap();
    }
    assert_eq!(game.phase(), imposter::Step::Voting);

    assert!(game
        .handle(imposter, imposter::Action::Vote { suspect: imposter }, &mut rng)
        .is_err());
    let scapegoat = (1..=4).map(pid).find(|p| *p != imposter).unwrap();
    for id in 1..=4 {
        let suspect = if pid(id) == imposter { scapegoat } else { imposter };
        game.handle(pid(id), imposter::Action::Vote { suspect }, &mut rng)
            .unwrap();
    }
    assert_eq!(game.phase(), imposter::Step::Results);
    assert_eq!(game.scores().get(imposter), 0);
    assert_eq!(game.scores().get(scapegoat), imposter::CORRECT_VOTE);

    assert!(game.handle(pid(2), imposter::Action::Next, &mut rng).is_err());
    game.handle(pid(1), imposter::Action::Next, &mut rng).unwrap();
    assert_eq!(game.round(), 2);
    assert_eq!(game.phase(), imposter::Step::Clues);
}

// =========================================================================
// Insider
// =========================================================================

#[test]
fn test_insider_caught_by_plurality() {
    let mut rng = rng();
    let (mut game, _) = Insider::start(&seats(5), &mut rng);
    let master = game.master();
    let insider = game.insider();
    assert_ne!(master, insider);

    let err = game
        .handle(insider, insider::Action::WordGuessed { guesser: insider }, &mut rng)
        .unwrap_err();
    assert_eq!(err.0, "Only the master can confirm the word");
    let fx = game
        .handle(master, insider::Action::WordGuessed { guesser: insider }, &mut rng)
        .unwrap();
    assert_eq!(game.phase(), insider::Step::Voting);
    assert!(fx
        .timers()
        .contains(&huddle_room::TimerOp::Cancel(insider::Timer::QuestionsOver)));

    let other = (1..=5).map(pid).find(|p| *p != insider).unwrap();
    for id in 1..=5 {
        let suspect = if pid(id) == insider { other } else { insider };
        game.handle(pid(id), insider::Action::Vote { suspect }, &mut rng)
            .unwrap();
    }
    assert!(game.is_finished());
    assert_eq!(game.outcome(), Some(Outcome::InsiderCaught));
}

#[test]
fn test_insider_time_up_everyone_loses() {
    let mut rng = rng();
    let (mut game, _) = Insider::start(&seats(4), &mut rng);
    game.on_timer(insider::Timer::QuestionsOver, &mut rng);
    assert!(game.is_finished());
    assert_eq!(game.outcome(), Some(Outcome::TimeUp));

    let late = game
        .handle(game.master(), insider::Action::WordGuessed { guesser: game.insider() }, &mut rng)
        .unwrap();
    assert!(late.is_empty());
}

// =========================================================================
// Wavelength
// =========================================================================

#[test]
fn test_wavelength_psychic_rotates_and_scores() {
    let mut rng = rng();
    let (mut game, _) = Wavelength::start(&seats(4), &mut rng);
    assert_eq!(game.psychic(), pid(1));

    assert!(game
        .handle(pid(2), wavelength::Action::Clue { text: "warm".into() }, &mut rng)
        .is_err());
    game.handle(pid(1), wavelength::Action::Clue { text: "warm".into() }, &mut rng)
        .unwrap();

    let target = game.target();
    let far = if target > 50 { 0 } else { 100 };
    game.handle(pid(2), wavelength::Action::Guess { value: target }, &mut rng)
        .unwrap();
    game.handle(pid(3), wavelength::Action::Guess { value: far }, &mut rng)
        .unwrap();
    assert!(game
        .handle(pid(1), wavelength::Action::Guess { value: target }, &mut rng)
        .is_err());
    game.handle(pid(4), wavelength::Action::Guess { value: far }, &mut rng)
        .unwrap();

    assert_eq!(game.phase(), wavelength::Step::Reveal);
    assert_eq!(game.scores().get(pid(2)), 4);
    assert_eq!(game.scores().get(pid(1)), 4);
    assert_eq!(game.scores().get(pid(3)), 0);

    // the round's own deadline firing late changes nothing
    assert!(game.on_timer(wavelength::Timer::GuessTimeout(1), &mut rng).is_empty());
    game.on_timer(wavelength::Timer::NextRound(1), &mut rng);
    assert_eq!(game.round(), 2);
    assert_eq!(game.psychic(), pid(2));
}

// =========================================================================
// NPAT
// =========================================================================

#[test]
fn test_npat_scores_once_when_complete() {
    let mut rng = rng();
    let (mut game, _) = Npat::start(&seats(3), &mut rng);
    let l = game.letter();

    let sheet = |name: &str, place: &str, thing: &str| Sheet {
        name: name.to_string(),
        place: place.to_string(),
        animal: String::new(),
        thing: thing.to_string(),
    };
    let answers = [
        sheet(&format!("{l}ana"), &format!("{l}ville"), &format!("{l}x1")),
        sheet(&format!("{l}ANA "), &format!("{l}town"), &format!("{l}x2")),
        sheet("zzz", "zzz", "zzz"),
    ];
    for (i, answers) in answers.into_iter().enumerate() {
        game.handle(pid(i as u64 + 1), npat::Action::Submit { answers }, &mut rng)
            .unwrap();
    }

    assert_eq!(game.phase(), npat::Step::Results);
    assert_eq!(game.scores().get(pid(1)), 25);
    assert_eq!(game.scores().get(pid(2)), 25);
    assert_eq!(game.scores().get(pid(3)), 0);

    assert!(game.on_timer(npat::Timer::RoundTimeout(1), &mut rng).is_empty());
    assert_eq!(game.scores().get(pid(1)), 25);
}

#[test]
fn test_npat_timeout_scores_partial_round() {
    let mut rng = rng();
    let (mut game, _) = Npat::start(&seats(3), &mut rng);
    let l = game.letter();
    let answers = Sheet {
        name: format!("{l}a"),
        ..Sheet::default()
    };
    game.handle(pid(1), npat::Action::Submit { answers }, &mut rng)
        .unwrap();
    assert_eq!(game.phase(), npat::Step::Answering);

    let fx = game.on_timer(npat::Timer::RoundTimeout(1), &mut rng);
    assert!(!fx.is_empty());
    assert_eq!(game.scores().get(pid(1)), 10);
}

// =========================================================================
// Punchline
// =========================================================================

#[test]
fn test_punchline_votes_by_ballot_position() {
    let mut rng = rng();
    let (mut game, _) = Punchline::start(&seats(3), &mut rng);
    for id in 1..=3 {
        game.handle(pid(id), punchline::Action::Write { text: format!("line {id}") }, &mut rng)
            .unwrap();
    }
    assert_eq!(game.phase(), punchline::Step::Voting);

    let ballot = game.ballot().to_vec();
    let own = ballot.iter().position(|a| *a == pid(1)).unwrap();
    assert!(game
        .handle(pid(1), punchline::Action::Vote { line: own }, &mut rng)
        .is_err());
    assert!(game
        .handle(pid(1), punchline::Action::Vote { line: 9 }, &mut rng)
        .is_err());

    let line_of = |author: u64| ballot.iter().position(|a| *a == pid(author)).unwrap();
    game.handle(pid(1), punchline::Action::Vote { line: line_of(3) }, &mut rng)
        .unwrap();
    game.handle(pid(2), punchline::Action::Vote { line: line_of(3) }, &mut rng)
        .unwrap();
    game.handle(pid(3), punchline::Action::Vote { line: line_of(1) }, &mut rng)
        .unwrap();

    assert_eq!(game.phase(), punchline::Step::Results);
    assert_eq!(game.scores().get(pid(3)), 200);
    assert_eq!(game.scores().get(pid(1)), 100);
    assert_eq!(game.scores().get(pid(2)), 0);
}

// =========================================================================
// Hot Takes
// =========================================================================

#[test]
fn test_hot_takes_pays_every_tied_mode_until_the_last_round() {
    let mut rng = rng();
    let (mut game, _) = HotTakes::start(&seats(5), &mut rng);

    let err = game
        .handle(pid(1), hot_takes::Action::Rate { rating: 0 }, &mut rng)
        .unwrap_err();
    assert_eq!(err.to_string(), "Rating must be between 1 and 5");

    for round in 1..=hot_takes::ROUNDS {
        assert_eq!(game.round(), round);
        assert_eq!(game.phase(), hot_takes::Step::Rating);
        let fx = [(1, 2), (2, 5), (3, 2), (4, 5), (5, 3)]
            .into_iter()
            .map(|(id, rating)| {
                game.handle(pid(id), hot_takes::Action::Rate { rating }, &mut rng)
                    .unwrap()
            })
            .last()
            .unwrap();
        let modes = events(&fx).into_iter().find_map(|e| match e {
            hot_takes::Event::RoundResults { modes, .. } => Some(modes),
            _ => None,
        });
        assert_eq!(modes, Some(vec![2, 5]));

        if round < hot_takes::ROUNDS {
            assert_eq!(game.phase(), hot_takes::Step::Results);
            // a timer from an earlier round is ignored
            let stale = game.on_timer(hot_takes::Timer::NextRound(round - 1), &mut rng);
            assert!(stale.messages().is_empty());
            assert_eq!(game.phase(), hot_takes::Step::Results);
            game.on_timer(hot_takes::Timer::NextRound(round), &mut rng);
        }
    }

    assert_eq!(game.phase(), hot_takes::Step::Ended);
    assert!(game.is_finished());
    for id in 1..=4 {
        assert_eq!(game.scores().get(pid(id)), 800);
    }
    assert_eq!(game.scores().get(pid(5)), 0);
    // the last round's timer never fires into a finished game
    let fx = game.on_timer(hot_takes::Timer::NextRound(hot_takes::ROUNDS), &mut rng);
    assert!(fx.messages().is_empty());
}

// =========================================================================
// This-or-That
// =========================================================================

#[test]
fn test_this_or_that_even_split_scores_nothing() {
    let mut rng = rng();
    let (mut game, _) = ThisOrThat::start(&seats(4), &mut rng);
    for (id, pick) in [(1, Pick::This), (2, Pick::That), (3, Pick::This), (4, Pick::That)] {
        game.handle(pid(id), this_or_that::Action::Choose { pick }, &mut rng)
            .unwrap();
    }
    assert!((1..=4).all(|id| game.scores().get(pid(id)) == 0));

    game.on_timer(this_or_that::Timer::NextRound(1), &mut rng);
    for (id, pick) in [(1, Pick::This), (2, Pick::That), (3, Pick::This), (4, Pick::This)] {
        game.handle(pid(id), this_or_that::Action::Choose { pick }, &mut rng)
            .unwrap();
    }
    assert_eq!(game.scores().get(pid(1)), 100);
    assert_eq!(game.scores().get(pid(2)), 0);
}

// =========================================================================
// Bet-or-Bluff
// =========================================================================

#[test]
fn test_bet_or_bluff_settles_on_median() {
    let mut rng = rng();
    let (mut game, _) = BetOrBluff::start(&seats(3), &mut rng);
    for (id, value) in [(1, 10), (2, 20), (3, 100)] {
        game.handle(pid(id), bet_or_bluff::Action::Guess { value }, &mut rng)
            .unwrap();
    }
    assert_eq!(game.phase(), bet_or_bluff::Step::Betting);

    game.handle(pid(1), bet_or_bluff::Action::Bet { on: pid(2), amount: 50 }, &mut rng)
        .unwrap();
    // more than the balance is capped at the balance
    game.handle(pid(2), bet_or_bluff::Action::Bet { on: pid(3), amount: 500 }, &mut rng)
        .unwrap();
    let fx = game.on_timer(bet_or_bluff::Timer::BetTimeout(1), &mut rng);

    let result = events(&fx).into_iter().find_map(|e| match e {
        bet_or_bluff::Event::RoundResults { target, closest, .. } => Some((target, closest)),
        _ => None,
    });
    assert_eq!(result, Some((20.0, pid(2))));
    assert_eq!(game.balance(pid(1)), 150);
    assert_eq!(game.balance(pid(2)), 25);
    assert_eq!(game.balance(pid(3)), 100);
}

#[test]
fn test_bet_or_bluff_backfills_missing_guesses() {
    let mut rng = rng();
    let (mut game, _) = BetOrBluff::start(&seats(3), &mut rng);
    game.handle(pid(1), bet_or_bluff::Action::Guess { value: 40 }, &mut rng)
        .unwrap();
    let fx = game.on_timer(bet_or_bluff::Timer::GuessTimeout(1), &mut rng);

    let guesses = events(&fx).into_iter().find_map(|e| match e {
        bet_or_bluff::Event::BettingStarted { guesses, .. } => Some(guesses),
        _ => None,
    });
    let values: Vec<i64> = guesses.unwrap().iter().map(|g| g.value).collect();
    assert_eq!(values, vec![40, 0, 0]);

    // nobody bets: median 0, P-2 is the earliest closest seat
    game.on_timer(bet_or_bluff::Timer::BetTimeout(1), &mut rng);
    assert_eq!(game.balance(pid(2)), 100 + huddle_games::scoring::CLOSEST_BONUS);
    assert_eq!(game.balance(pid(1)), 100);
}
