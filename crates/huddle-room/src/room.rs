//! The room data model: players, host and lifecycle state.
//!
//! [`Room`] is plain data with validation. It is owned by exactly one room
//! actor (see `actor.rs`), which is what serializes access to it.

use std::time::Instant;

use huddle_protocol::{GameKind, PlayerId, PlayerSummary, RoomCode, RoomSnapshot, RoomState};

use crate::{PlayerLimits, RoomError, Seat};

/// Longest player name accepted, in characters, after trimming.
pub const MAX_NAME_LEN: usize = 24;

/// Trims `raw` and checks its length.
pub fn normalize_name(raw: &str) -> Result<String, RoomError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(RoomError::InvalidName { max: MAX_NAME_LEN });
    }
    Ok(name.to_string())
}

/// A member of a room. Disconnected players keep their place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub connected: bool,
}

/// What a disconnect changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Departure {
    /// The new host, if the host role moved.
    pub new_host: Option<PlayerId>,
    /// Nobody in the room is connected any more.
    pub room_empty: bool,
}

/// One game session's membership and lifecycle.
#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    kind: GameKind,
    state: RoomState,
    host: PlayerId,
    /// Join order; also seating order.
    players: Vec<Player>,
    limits: PlayerLimits,
    created_at: Instant,
}

impl Room {
    /// Opens a lobby with `host` as its only player.
    pub fn new(
        code: RoomCode,
        kind: GameKind,
        limits: PlayerLimits,
        host: PlayerId,
        host_name: String,
    ) -> Self {
        Self {
            code,
            kind,
            state: RoomState::Lobby,
            host,
            players: vec![Player {
                id: host,
                name: host_name,
                connected: true,
            }],
            limits,
            created_at: Instant::now(),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn host(&self) -> PlayerId {
        self.host
    }

    pub fn limits(&self) -> PlayerLimits {
        self.limits
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    /// Number of connected players.
    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    /// Adds a player to the lobby.
    ///
    /// On error the player list is unchanged.
    pub fn add_player(&mut self, id: PlayerId, raw_name: &str) -> Result<(), RoomError> {
        if self.contains(id) {
            return Err(RoomError::AlreadyInRoom(id));
        }
        if !self.state.is_joinable() {
            return Err(RoomError::GameAlreadyStarted);
        }
        let name = normalize_name(raw_name)?;
        let folded = name.to_lowercase();
        if self.players.iter().any(|p| p.name.to_lowercase() == folded) {
            return Err(RoomError::NameTaken(name));
        }
        if self.players.len() >= self.limits.max {
            return Err(RoomError::RoomFull {
                max: self.limits.max,
            });
        }

        self.players.push(Player {
            id,
            name,
            connected: true,
        });
        Ok(())
    }

    /// Marks `id` disconnected. The player keeps their seat and name.
    ///
    /// The host role moves to the next connected player in seating order
    /// when the host leaves while the room is waiting for a start (in the
    /// lobby, or after a game ended).
    pub fn mark_disconnected(&mut self, id: PlayerId) -> Result<Departure, RoomError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(RoomError::NotInRoom(id))?;
        self.players[index].connected = false;

        let mut departure = Departure {
            new_host: None,
            room_empty: self.connected_count() == 0,
        };

        if id == self.host && self.state != RoomState::Playing {
            let n = self.players.len();
            let next = (1..n)
                .map(|offset| &self.players[(index + offset) % n])
                .find(|p| p.connected)
                .map(|p| p.id);
            if let Some(next) = next {
                self.host = next;
                departure.new_host = Some(next);
            }
        }

        Ok(departure)
    }

    /// Validates a start request from `sender` and returns the seats to deal
    /// (connected players, in seating order).
    pub fn check_start(&self, sender: PlayerId) -> Result<Vec<Seat>, RoomError> {
        if !self.state.can_start() {
            return Err(RoomError::GameAlreadyStarted);
        }
        if sender != self.host {
            return Err(RoomError::NotHost);
        }
        let seats: Vec<Seat> = self
            .players
            .iter()
            .filter(|p| p.connected)
            .map(|p| Seat::new(p.id, p.name.clone()).with_host(p.id == self.host))
            .collect();
        if seats.len() < self.limits.min {
            return Err(RoomError::NotEnoughPlayers {
                min: self.limits.min,
                actual: seats.len(),
            });
        }
        if seats.len() > self.limits.max {
            return Err(RoomError::TooManyPlayers {
                max: self.limits.max,
                actual: seats.len(),
            });
        }
        Ok(seats)
    }

    /// Moves the room to `to`. Returns `false` (and changes nothing) if the
    /// lifecycle table forbids it.
    pub fn transition(&mut self, to: RoomState) -> bool {
        if !self.state.can_transition_to(to) {
            return false;
        }
        tracing::debug!(room = %self.code, from = %self.state, %to, "room state changed");
        self.state = to;
        true
    }

    /// The public view of the room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            game: self.kind,
            state: self.state,
            host: self.host,
            players: self
                .players
                .iter()
                .map(|p| PlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                    connected: p.connected,
                    is_host: p.id == self.host,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn lobby(limits: PlayerLimits) -> Room {
        let code = RoomCode::parse("ABCDEF").unwrap();
        Room::new(code, GameKind::Imposter, limits, p(1), "Ana".into())
    }

    #[test]
    fn test_new_room_has_exactly_one_host() {
        let room = lobby(PlayerLimits::GENERIC);
        let snapshot = room.snapshot();
        assert_eq!(snapshot.state, RoomState::Lobby);
        assert_eq!(snapshot.players.iter().filter(|p| p.is_host).count(), 1);
        assert_eq!(snapshot.host, p(1));
    }

    #[test]
    fn test_duplicate_name_is_rejected_without_mutation() {
        let mut room = lobby(PlayerLimits::GENERIC);
        room.add_player(p(2), "Bo").unwrap();
        let before = room.players().to_vec();

        let err = room.add_player(p(3), "  bo ").unwrap_err();
        assert_eq!(err, RoomError::NameTaken("bo".into()));
        assert_eq!(room.players(), before.as_slice());
    }

    #[test]
    fn test_invalid_names() {
        let mut room = lobby(PlayerLimits::GENERIC);
        assert!(matches!(
            room.add_player(p(2), "   "),
            Err(RoomError::InvalidName { .. })
        ));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            room.add_player(p(2), &long),
            Err(RoomError::InvalidName { .. })
        ));
        assert_eq!(normalize_name(" Cy ").unwrap(), "Cy");
    }

    #[test]
    fn test_room_full_at_game_maximum() {
        let mut room = lobby(PlayerLimits::new(1, 2));
        room.add_player(p(2), "Bo").unwrap();
        assert_eq!(
            room.add_player(p(3), "Cy"),
            Err(RoomError::RoomFull { max: 2 })
        );
    }

    #[test]
    fn test_join_after_start_is_rejected() {
        let mut room = lobby(PlayerLimits::new(1, 8));
        assert!(room.transition(RoomState::Playing));
        assert_eq!(room.add_player(p(2), "Bo"), Err(RoomError::GameAlreadyStarted));
    }

    #[test]
    fn test_host_moves_to_next_connected_in_lobby() {
        let mut room = lobby(PlayerLimits::GENERIC);
        room.add_player(p(2), "Bo").unwrap();
        room.add_player(p(3), "Cy").unwrap();
        room.mark_disconnected(p(2)).unwrap();

        let departure = room.mark_disconnected(p(1)).unwrap();
        assert_eq!(departure.new_host, Some(p(3)));
        assert!(!departure.room_empty);
        assert_eq!(room.host(), p(3));
        assert!(room.contains(p(1)), "disconnected players keep their seat");
    }

    #[test]
    fn test_host_stays_during_play() {
        let mut room = lobby(PlayerLimits::new(2, 8));
        room.add_player(p(2), "Bo").unwrap();
        room.transition(RoomState::Playing);
        let departure = room.mark_disconnected(p(1)).unwrap();
        assert_eq!(departure.new_host, None);
        assert_eq!(room.host(), p(1));
    }

    #[test]
    fn test_last_disconnect_empties_room() {
        let mut room = lobby(PlayerLimits::GENERIC);
        let departure = room.mark_disconnected(p(1)).unwrap();
        assert!(departure.room_empty);
        assert_eq!(departure.new_host, None);
        assert_eq!(room.mark_disconnected(p(9)), Err(RoomError::NotInRoom(p(9))));
    }

    #[test]
    fn test_check_start_rules() {
        let mut room = lobby(PlayerLimits::new(3, 4));
        room.add_player(p(2), "Bo").unwrap();
        assert_eq!(room.check_start(p(2)), Err(RoomError::NotHost));
        assert_eq!(
            room.check_start(p(1)),
            Err(RoomError::NotEnoughPlayers { min: 3, actual: 2 })
        );

        room.add_player(p(3), "Cy").unwrap();
        room.add_player(p(4), "Di").unwrap();
        room.mark_disconnected(p(4)).unwrap();
        let seats = room.check_start(p(1)).unwrap();
        let ids: Vec<_> = seats.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![p(1), p(2), p(3)], "only connected players are seated");
        assert!(seats[0].is_host);
        assert!(!seats[1].is_host);
    }

    #[test]
    fn test_rematch_from_ended() {
        let mut room = lobby(PlayerLimits::new(1, 4));
        assert!(room.transition(RoomState::Playing));
        assert_eq!(room.check_start(p(1)), Err(RoomError::GameAlreadyStarted));
        assert!(room.transition(RoomState::Ended));
        assert!(!room.transition(RoomState::Lobby));
        assert!(room.check_start(p(1)).is_ok());
    }
}
