//! Avalon: hidden loyalties, team proposals and five quests.
//!
//! ```text
//! team-select ──propose──→ team-vote ──approved──→ quest ──┐
//!      ↑                      │                             │
//!      └──────rejected────────┘                             │
//!      └──────────────────next quest────────────────────────┘
//! team-vote ──fifth rejection──→ ended     quest ──3 wins/fails──→ ended
//! ```
//!
//! The leader seat rotates after every rejected proposal and every
//! resolved quest. The rejection counter only resets when a quest
//! resolves.

use std::collections::{BTreeMap, BTreeSet};

use huddle_protocol::PlayerId;
use huddle_room::{ActionError, ActionResult, Effects, Phase, PhaseMachine, PlayerLimits, Seat, Submissions};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::rules::{Roster, Rules};

/// Quests per game.
pub const QUESTS: usize = 5;
/// Consecutive rejected proposals that hand the game to evil.
pub const MAX_REJECTIONS: u32 = 5;

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Evil players for a table of `players` (5 to 15).
pub fn evil_count(players: usize) -> usize {
    match players {
        0..=6 => 2,
        7..=9 => 3,
        10..=11 => 4,
        12..=14 => 5,
        _ => 6,
    }
}

/// Team size for each of the five quests.
pub fn quest_sizes(players: usize) -> [usize; QUESTS] {
    match players {
        0..=5 => [2, 3, 2, 3, 3],
        6 => [2, 3, 4, 3, 4],
        7 => [2, 3, 3, 4, 4],
        8..=12 => [3, 4, 4, 5, 5],
        _ => [4, 5, 5, 6, 6],
    }
}

/// Fail cards needed to fail quest `quest` (0-based): two on the fourth
/// quest at seven or more players, otherwise one.
pub fn fails_needed(quest: usize, players: usize) -> usize {
    if quest == 3 && players >= 7 { 2 } else { 1 }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    Good,
    Evil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Merlin,
    Percival,
    LoyalServant,
    Assassin,
    Morgana,
    Mordred,
    Oberon,
    Minion,
}

impl Role {
    pub fn alignment(self) -> Alignment {
        match self {
            Role::Merlin | Role::Percival | Role::LoyalServant => Alignment::Good,
            _ => Alignment::Evil,
        }
    }

    /// Whether a player holding `self` is shown a player holding `other`.
    ///
    /// Merlin sees evil except Mordred. Evil (except Oberon) sees the rest
    /// of evil. Percival sees Merlin and Morgana without telling them
    /// apart.
    pub fn sees(self, other: Role) -> bool {
        match self {
            Role::Merlin => other.alignment() == Alignment::Evil && other != Role::Mordred,
            Role::Percival => matches!(other, Role::Merlin | Role::Morgana),
            Role::Oberon => false,
            _ if self.alignment() == Alignment::Evil => other.alignment() == Alignment::Evil,
            _ => false,
        }
    }
}

/// The roles dealt at a table of `players`, before shuffling.
pub fn role_pool(players: usize) -> Vec<Role> {
    let evil = evil_count(players);
    let mut pool = vec![Role::Assassin];
    if players >= 7 {
        pool.push(Role::Morgana);
    }
    if players >= 10 {
        pool.push(Role::Mordred);
    }
    while pool.len() < evil {
        pool.push(Role::Minion);
    }

    pool.push(Role::Merlin);
    if players >= 7 {
        pool.push(Role::Percival);
    }
    while pool.len() < players {
        pool.push(Role::LoyalServant);
    }
    pool
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestResult {
    Success,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Leader only: put `team` up for a vote.
    Propose { team: Vec<PlayerId> },
    /// Everyone: approve or reject the proposed team.
    Vote { approve: bool },
    /// Team members only: play a success or fail card.
    Quest { success: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub player: PlayerId,
    pub approve: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleReveal {
    pub player: PlayerId,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    /// Private: your role and who you can see.
    Role {
        role: Role,
        alignment: Alignment,
        visible: Vec<PlayerId>,
    },
    TeamSelect {
        leader: PlayerId,
        quest: usize,
        team_size: usize,
        rejections: u32,
    },
    TeamProposed {
        leader: PlayerId,
        team: Vec<PlayerId>,
    },
    VoteResult {
        approves: usize,
        rejects: usize,
        votes: Vec<Ballot>,
        approved: bool,
        rejections: u32,
    },
    QuestStarted {
        team: Vec<PlayerId>,
    },
    QuestResult {
        quest: usize,
        fails: usize,
        fails_needed: usize,
        result: QuestResult,
        results: Vec<QuestResult>,
    },
    GameOver {
        winner: Alignment,
        reason: String,
        roles: Vec<RoleReveal>,
    },
}

/// Avalon has no deadlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    TeamSelect,
    TeamVote,
    Quest,
    Ended,
}

impl Phase for Step {
    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Step::TeamSelect, Step::TeamVote)
                | (Step::TeamVote, Step::TeamSelect)
                | (Step::TeamVote, Step::Quest)
                | (Step::TeamVote, Step::Ended)
                | (Step::Quest, Step::TeamSelect)
                | (Step::Quest, Step::Ended)
        )
    }
}

#[derive(Debug)]
pub struct Avalon {
    roster: Roster,
    phase: PhaseMachine<Step>,
    roles: BTreeMap<PlayerId, Role>,
    sizes: [usize; QUESTS],
    /// Leader counter; the leader is seat `leader % players`.
    leader: usize,
    quest: usize,
    results: Vec<QuestResult>,
    rejections: u32,
    team: Vec<PlayerId>,
    votes: Submissions<bool>,
    cards: Submissions<bool>,
    winner: Option<Alignment>,
}

impl Avalon {
    pub fn phase(&self) -> Step {
        self.phase.current()
    }

    pub fn leader(&self) -> PlayerId {
        self.roster.at(self.leader)
    }

    pub fn leader_index(&self) -> usize {
        self.leader % self.roster.len()
    }

    pub fn current_quest(&self) -> usize {
        self.quest
    }

    pub fn quest_results(&self) -> &[QuestResult] {
        &self.results
    }

    pub fn quest_sizes(&self) -> [usize; QUESTS] {
        self.sizes
    }

    pub fn rejections(&self) -> u32 {
        self.rejections
    }

    pub fn team(&self) -> &[PlayerId] {
        &self.team
    }

    pub fn role_of(&self, player: PlayerId) -> Option<Role> {
        self.roles.get(&player).copied()
    }

    pub fn winner(&self) -> Option<Alignment> {
        self.winner
    }

    /// Players `player` is shown at the start, in seating order.
    pub fn visible_to(&self, player: PlayerId) -> Vec<PlayerId> {
        let Some(role) = self.role_of(player) else {
            return Vec::new();
        };
        self.roster
            .others(player)
            .filter(|other| self.role_of(*other).is_some_and(|r| role.sees(r)))
            .collect()
    }

    fn team_select(&self) -> Event {
        Event::TeamSelect {
            leader: self.leader(),
            quest: self.quest,
            team_size: self.sizes[self.quest],
            rejections: self.rejections,
        }
    }

    fn game_over(&mut self, winner: Alignment, reason: &str) -> Event {
        self.winner = Some(winner);
        tracing::debug!(?winner, reason, "avalon finished");
        Event::GameOver {
            winner,
            reason: reason.to_string(),
            roles: self
                .roster
                .ids()
                .filter_map(|player| {
                    self.role_of(player)
                        .map(|role| RoleReveal { player, role })
                })
                .collect(),
        }
    }

    fn propose(&mut self, sender: PlayerId, team: Vec<PlayerId>) -> ActionResult<Event, Timer> {
        if !self.phase.is(Step::TeamSelect) {
            return Ok(Effects::none());
        }
        if sender != self.leader() {
            return Err(ActionError::new("Only the leader can propose a team"));
        }
        let size = self.sizes[self.quest];
        if team.len() != size {
            return Err(ActionError::new(format!(
                "The team must have exactly {size} players"
            )));
        }
        let unique: BTreeSet<PlayerId> = team.iter().copied().collect();
        if unique.len() != team.len() {
            return Err(ActionError::new("A player can only be on the team once"));
        }
        for member in &team {
            self.roster.require(*member)?;
        }
        if self.phase.advance(Step::TeamSelect, Step::TeamVote).is_err() {
            return Ok(Effects::none());
        }

        self.team = team;
        self.votes = Submissions::new(self.roster.ids());

        let mut fx = Effects::none();
        fx.broadcast(Event::TeamProposed {
            leader: sender,
            team: self.team.clone(),
        });
        Ok(fx)
    }

    fn vote(&mut self, sender: PlayerId, approve: bool) -> ActionResult<Event, Timer> {
        if !self.phase.is(Step::TeamVote) {
            return Ok(Effects::none());
        }
        self.votes.submit(sender, approve)?;
        if self.votes.is_complete() {
            Ok(self.resolve_vote())
        } else {
            Ok(Effects::none())
        }
    }

    fn resolve_vote(&mut self) -> Effects<Event, Timer> {
        let approves = self.votes.iter().filter(|(_, v)| **v).count();
        let rejects = self.votes.len() - approves;
        let approved = approves > rejects;

        let next = if approved {
            Step::Quest
        } else if self.rejections + 1 >= MAX_REJECTIONS {
            Step::Ended
        } else {
            Step::TeamSelect
        };
        if self.phase.advance(Step::TeamVote, next).is_err() {
            return Effects::none();
        }

        if !approved {
            self.rejections += 1;
        }

        let mut fx = Effects::none();
        fx.broadcast(Event::VoteResult {
            approves,
            rejects,
            votes: self
                .votes
                .iter()
                .map(|(player, approve)| Ballot {
                    player,
                    approve: *approve,
                })
                .collect(),
            approved,
            rejections: self.rejections,
        });

        match next {
            Step::Quest => {
                self.cards = Submissions::new(self.team.iter().copied());
                fx.broadcast(Event::QuestStarted {
                    team: self.team.clone(),
                });
            }
            Step::Ended => {
                let over = self.game_over(Alignment::Evil, "Five team rejections");
                fx.broadcast(over);
            }
            _ => {
                self.leader += 1;
                fx.broadcast(self.team_select());
            }
        }
        fx
    }

    fn play_card(&mut self, sender: PlayerId, success: bool) -> ActionResult<Event, Timer> {
        if !self.phase.is(Step::Quest) {
            return Ok(Effects::none());
        }
        if !self.cards.is_eligible(sender) {
            return Err(ActionError::new("Only team members go on the quest"));
        }
        let good = self
            .role_of(sender)
            .is_some_and(|r| r.alignment() == Alignment::Good);
        if !success && good {
            return Err(ActionError::new("Loyal players can only play success"));
        }
        self.cards.submit(sender, success)?;
        if self.cards.is_complete() {
            Ok(self.resolve_quest())
        } else {
            Ok(Effects::none())
        }
    }

    fn resolve_quest(&mut self) -> Effects<Event, Timer> {
        let fails = self.cards.iter().filter(|(_, s)| !**s).count();
        let needed = fails_needed(self.quest, self.roster.len());
        let result = if fails < needed {
            QuestResult::Success
        } else {
            QuestResult::Fail
        };

        let mut results = self.results.clone();
        results.push(result);
        let successes = results.iter().filter(|r| **r == QuestResult::Success).count();
        let failures = results.len() - successes;
        let next = if successes >= 3 || failures >= 3 {
            Step::Ended
        } else {
            Step::TeamSelect
        };
        if self.phase.advance(Step::Quest, next).is_err() {
            return Effects::none();
        }

        self.results = results;
        self.rejections = 0;

        let mut fx = Effects::none();
        fx.broadcast(Event::QuestResult {
            quest: self.quest,
            fails,
            fails_needed: needed,
            result,
            results: self.results.clone(),
        });

        if next == Step::Ended {
            let over = if successes >= 3 {
                self.game_over(Alignment::Good, "Three quests succeeded")
            } else {
                self.game_over(Alignment::Evil, "Three quests failed")
            };
            fx.broadcast(over);
        } else {
            self.quest += 1;
            self.leader += 1;
            fx.broadcast(self.team_select());
        }
        fx
    }
}

impl Rules for Avalon {
    type Action = Action;
    type Event = Event;
    type Timer = Timer;

    fn limits() -> PlayerLimits {
        PlayerLimits::new(5, 15)
    }

    fn start(seats: &[Seat], rng: &mut StdRng) -> (Self, Effects<Event, Timer>) {
        let roster = Roster::new(seats);
        let players = roster.len();

        let mut order: Vec<PlayerId> = roster.ids().collect();
        order.shuffle(rng);
        let mut pool = role_pool(players);
        pool.shuffle(rng);
        let roles: BTreeMap<PlayerId, Role> = order.into_iter().zip(pool).collect();

        let game = Avalon {
            phase: PhaseMachine::new(Step::TeamSelect),
            roles,
            sizes: quest_sizes(players),
            leader: 0,
            quest: 0,
            results: Vec::new(),
            rejections: 0,
            team: Vec::new(),
            votes: Submissions::new(roster.ids()),
            cards: Submissions::default(),
            winner: None,
            roster,
        };

        let mut fx = Effects::none();
        for player in game.roster.ids() {
            if let Some(role) = game.role_of(player) {
                fx.send_to(
                    player,
                    Event::Role {
                        role,
                        alignment: role.alignment(),
                        visible: game.visible_to(player),
                    },
                );
            }
        }
        fx.broadcast(game.team_select());
        (game, fx)
    }

    fn handle(&mut self, sender: PlayerId, action: Action, _rng: &mut StdRng) -> ActionResult<Event, Timer> {
        match action {
            Action::Propose { team } => self.propose(sender, team),
            Action::Vote { approve } => self.vote(sender, approve),
            Action::Quest { success } => self.play_card(sender, success),
        }
    }

    fn on_timer(&mut self, timer: Timer, _rng: &mut StdRng) -> Effects<Event, Timer> {
        match timer {}
    }

    fn is_finished(&self) -> bool {
        self.phase.is(Step::Ended)
    }
}
