//! Room registry: creates, tracks, and routes players to rooms.

use std::collections::HashMap;

use huddle_protocol::{GameKind, PlayerId, RoomCode, RoomSnapshot};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::actor::spawn_room;
use crate::room::normalize_name;
use crate::{GameLogic, PlayerSender, RoomConfig, RoomError, RoomHandle};

/// Tracks every live room and which room each player is in.
///
/// Constructed once by the server and passed to whoever needs it. Methods
/// that only look things up hand out cloned [`RoomHandle`]s, so a caller
/// behind a lock can release it before awaiting the room's reply.
pub struct RoomRegistry<G: GameLogic> {
    /// Live rooms, keyed by code.
    rooms: HashMap<RoomCode, RoomHandle<G>>,

    /// Maps each player to the room they are in.
    /// A player is in at most ONE room at a time.
    player_rooms: HashMap<PlayerId, RoomCode>,

    config: RoomConfig,

    /// Generates room codes.
    rng: StdRng,
}

impl<G: GameLogic> RoomRegistry<G> {
    /// Creates an empty registry.
    pub fn new(config: RoomConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            config,
            rng,
        }
    }

    /// The configuration every new room receives.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens a room for `kind` with `player_id` as host and only player.
    ///
    /// The code is drawn at random until it collides with no live room.
    pub fn create_room(
        &mut self,
        player_id: PlayerId,
        player_name: &str,
        kind: GameKind,
        sender: PlayerSender<G>,
    ) -> Result<RoomCode, RoomError> {
        self.ensure_free(player_id)?;
        let name = normalize_name(player_name)?;

        let code = loop {
            let candidate = RoomCode::random(&mut self.rng);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
            tracing::debug!(code = %candidate, "room code collision, retrying");
        };

        let handle = spawn_room::<G>(
            code.clone(),
            kind,
            player_id,
            name,
            sender,
            self.config.clone(),
        );
        self.rooms.insert(code.clone(), handle);
        self.player_rooms.insert(player_id, code.clone());

        tracing::info!(room = %code, game = %kind, host = %player_id, "room created");
        Ok(code)
    }

    /// Fails with `AlreadyInRoom` if `player_id` is in a room.
    pub fn ensure_free(&self, player_id: PlayerId) -> Result<(), RoomError> {
        if self.player_rooms.contains_key(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id));
        }
        Ok(())
    }

    /// The handle for the room under `code`.
    pub fn room(&self, code: &RoomCode) -> Result<RoomHandle<G>, RoomError> {
        self.rooms
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::RoomNotFound(code.to_string()))
    }

    /// The handle for the room `player_id` is in.
    pub fn handle_for(&self, player_id: PlayerId) -> Result<RoomHandle<G>, RoomError> {
        let code = self
            .player_rooms
            .get(&player_id)
            .ok_or(RoomError::NotInRoom(player_id))?;
        self.room(code)
    }

    /// Records that `player_id` joined the room under `code`.
    pub fn bind_player(&mut self, player_id: PlayerId, code: RoomCode) {
        self.player_rooms.insert(player_id, code);
    }

    /// Forgets which room `player_id` is in.
    pub fn unbind_player(&mut self, player_id: PlayerId) -> Option<RoomCode> {
        self.player_rooms.remove(&player_id)
    }

    /// Joins `player_id` to the room under `code`.
    ///
    /// Holds `&mut self` across the room's reply; callers sharing the
    /// registry behind a lock should use [`room`](Self::room) and
    /// [`bind_player`](Self::bind_player) instead.
    pub async fn join_room(
        &mut self,
        player_id: PlayerId,
        code: &RoomCode,
        player_name: &str,
        sender: PlayerSender<G>,
    ) -> Result<(), RoomError> {
        self.ensure_free(player_id)?;
        let handle = self.room(code)?;
        handle.join(player_id, player_name.to_string(), sender).await?;
        self.bind_player(player_id, code.clone());
        Ok(())
    }

    /// Starts the game in the room `player_id` is in.
    pub async fn start_game(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.handle_for(player_id)?.start(player_id).await
    }

    /// Routes game input from `player_id` to their room.
    pub async fn route_action(
        &self,
        player_id: PlayerId,
        action: G::Action,
    ) -> Result<(), RoomError> {
        self.handle_for(player_id)?
            .send_action(player_id, action)
            .await
    }

    /// Marks `player_id` disconnected in their room and forgets them.
    pub async fn disconnect(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        let handle = self.handle_for(player_id)?;
        self.unbind_player(player_id);
        handle.disconnect(player_id).await
    }

    /// The public view of the room under `code`.
    pub async fn room_snapshot(&self, code: &RoomCode) -> Result<RoomSnapshot, RoomError> {
        self.room(code)?.snapshot().await
    }

    /// The code of the room `player_id` is in, if any.
    pub fn player_room(&self, player_id: PlayerId) -> Option<&RoomCode> {
        self.player_rooms.get(&player_id)
    }

    /// Drops rooms whose actor has stopped (expired or died) and clears
    /// their players from the index. Returns the removed codes.
    pub fn sweep(&mut self) -> Vec<RoomCode> {
        let closed: Vec<RoomCode> = self
            .rooms
            .iter()
            .filter(|(_, handle)| handle.is_closed())
            .map(|(code, _)| code.clone())
            .collect();

        for code in &closed {
            self.rooms.remove(code);
            self.player_rooms.retain(|_, c| c != code);
            tracing::info!(room = %code, "room removed from registry");
        }
        closed
    }

    /// Shuts down a room and removes all its players from the index.
    pub async fn destroy_room(&mut self, code: &RoomCode) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.to_string()))?;

        let _ = handle.shutdown().await;
        self.player_rooms.retain(|_, c| c != code);

        tracing::info!(room = %code, "room destroyed");
        Ok(())
    }

    /// Number of rooms in the registry.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Codes of all rooms in the registry.
    pub fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.keys().cloned().collect()
    }
}

impl<G: GameLogic> Default for RoomRegistry<G> {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
