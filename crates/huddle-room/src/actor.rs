//! Room actor: an isolated Tokio task that owns one room and its game.
//!
//! Each room runs in its own task and talks to the outside world through a
//! bounded mpsc channel. Commands, timer firings and game input are all
//! handled one at a time inside [`RoomActor::run`], so a room's state is
//! never touched concurrently. A panic inside game code is caught here and
//! ends only this room's game.

use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};

use huddle_protocol::{GameKind, PlayerId, Recipient, RoomCode, RoomSnapshot, RoomState, ServerEvent};
use huddle_timer::Timers;
use huddle_transport::{Subscriber, Topic};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};

use crate::room::Room;
use crate::{Effects, GameLogic, RoomConfig, RoomError, TimerOp};

/// Outbound queue for one player's connection handler.
pub type PlayerSender<G> = Subscriber<ServerEvent<<G as GameLogic>::Event>>;

/// Commands sent to a room actor through its channel.
///
/// Variants with a `reply` are request/response: the caller waits on the
/// oneshot for the outcome.
pub(crate) enum RoomCommand<G: GameLogic> {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender<G>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Start {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    /// Game input. Fire-and-forget; rejections go to the player's queue.
    Action {
        player_id: PlayerId,
        action: G::Action,
    },
    Disconnect {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone: it wraps an `mpsc::Sender`. The registry holds one per
/// room and hands out clones so callers can await replies without holding
/// the registry lock.
pub struct RoomHandle<G: GameLogic> {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand<G>>,
}

impl<G: GameLogic> Clone for RoomHandle<G> {
    fn clone(&self) -> Self {
        Self {
            code: self.code.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<G: GameLogic> RoomHandle<G> {
    /// The room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Adds a player to the lobby. On success the player receives
    /// `room-joined` and everyone receives a `room-update`.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender<G>,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            name,
            sender,
            reply,
        })
        .await?
    }

    /// Starts (or restarts) the game on behalf of `player_id`.
    pub async fn start(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start { player_id, reply })
            .await?
    }

    /// Delivers game input (fire-and-forget).
    pub async fn send_action(
        &self,
        player_id: PlayerId,
        action: G::Action,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Action { player_id, action })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Marks `player_id` disconnected.
    pub async fn disconnect(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Disconnect { player_id, reply })
            .await?
    }

    /// The room's current membership and state.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Stops the actor.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand<G>,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// Keys for the actor's timers.
#[derive(Debug, Clone, PartialEq)]
enum RoomTimer<T> {
    /// A deadline armed by the game.
    Game(T),
    /// The empty-room grace period ran out.
    Expire,
}

/// What woke the actor up.
enum Wake<C, T> {
    Command(C),
    Timer(RoomTimer<T>),
    Closed,
}

/// The room actor's state. Lives inside the spawned task.
struct RoomActor<G: GameLogic> {
    room: Room,
    topic: Topic<PlayerId, ServerEvent<G::Event>>,
    game: Option<G>,
    timers: Timers<RoomTimer<G::Timer>>,
    rng: StdRng,
    config: RoomConfig,
    receiver: mpsc::Receiver<RoomCommand<G>>,
}

impl<G: GameLogic> RoomActor<G> {
    async fn run(mut self) {
        tracing::info!(room = %self.room.code(), game = %self.room.kind(), "room actor started");

        loop {
            let wake = tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => Wake::Command(cmd),
                    None => Wake::Closed,
                },
                key = self.timers.next_due() => Wake::Timer(key),
            };

            let flow = match wake {
                Wake::Command(cmd) => self.handle_command(cmd),
                Wake::Timer(key) => self.handle_timer(key),
                Wake::Closed => ControlFlow::Break(()),
            };
            if flow.is_break() {
                break;
            }
        }

        self.timers.cancel_all();
        tracing::info!(room = %self.room.code(), "room actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand<G>) -> ControlFlow<()> {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                sender,
                reply,
            } => {
                let result = self.handle_join(player_id, &name, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Start { player_id, reply } => {
                let result = self.handle_start(player_id);
                let _ = reply.send(result);
            }
            RoomCommand::Action { player_id, action } => {
                self.handle_action(player_id, action);
            }
            RoomCommand::Disconnect { player_id, reply } => {
                let result = self.handle_disconnect(player_id);
                let _ = reply.send(result);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.snapshot());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room = %self.room.code(), "room shutting down");
                return ControlFlow::Break(());
            }
        }
        self.check_finished();
        ControlFlow::Continue(())
    }

    fn handle_timer(&mut self, key: RoomTimer<G::Timer>) -> ControlFlow<()> {
        match key {
            RoomTimer::Expire => {
                if self.room.connected_count() == 0 {
                    tracing::info!(room = %self.room.code(), "room expired");
                    return ControlFlow::Break(());
                }
            }
            RoomTimer::Game(timer) => {
                if self.room.state() != RoomState::Playing {
                    tracing::debug!(room = %self.room.code(), ?timer, "timer after game end dropped");
                    return ControlFlow::Continue(());
                }
                let rng = &mut self.rng;
                let outcome = match self.game.as_mut() {
                    Some(game) => panic::catch_unwind(AssertUnwindSafe(|| game.on_timer(timer, rng))),
                    None => return ControlFlow::Continue(()),
                };
                match outcome {
                    Ok(effects) => self.apply(effects),
                    Err(payload) => self.abort_game(panic_message(payload)),
                }
                self.check_finished();
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender<G>,
    ) -> Result<(), RoomError> {
        self.room.add_player(player_id, name)?;
        self.timers.cancel(&RoomTimer::Expire);
        self.topic.subscribe(player_id, sender);

        tracing::info!(
            room = %self.room.code(),
            %player_id,
            players = self.room.players().len(),
            "player joined"
        );

        self.topic.send_to(
            &player_id,
            ServerEvent::RoomJoined {
                room_code: self.room.code().clone(),
                player_id,
            },
        );
        self.broadcast_snapshot();
        Ok(())
    }

    fn handle_start(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        let seats = self.room.check_start(player_id)?;
        let kind = self.room.kind();
        let rng = &mut self.rng;

        let (game, effects) = panic::catch_unwind(AssertUnwindSafe(|| G::start(kind, &seats, rng)))
            .map_err(|payload| {
                let reason = panic_message(payload);
                tracing::warn!(room = %self.room.code(), %reason, "game panicked while dealing");
                RoomError::GameFault(reason)
            })?;

        // A rematch must not inherit the previous game's deadlines.
        self.cancel_game_timers();
        self.game = Some(game);
        self.room.transition(RoomState::Playing);

        tracing::info!(
            room = %self.room.code(),
            game = %kind,
            players = seats.len(),
            "game started"
        );

        self.topic.publish(&ServerEvent::GameStarted { game: kind });
        self.broadcast_snapshot();
        self.apply(effects);
        Ok(())
    }

    fn handle_action(&mut self, player_id: PlayerId, action: G::Action) {
        if !self.room.contains(player_id) {
            tracing::warn!(room = %self.room.code(), %player_id, "action from non-member, ignoring");
            return;
        }

        match self.room.state() {
            RoomState::Playing => {}
            RoomState::Ended => {
                tracing::debug!(room = %self.room.code(), %player_id, ?action, "action after game end dropped");
                return;
            }
            RoomState::Lobby => {
                self.send_error(player_id, &RoomError::GameNotStarted);
                return;
            }
        }

        let rng = &mut self.rng;
        let outcome = match self.game.as_mut() {
            Some(game) => {
                panic::catch_unwind(AssertUnwindSafe(|| game.handle_action(player_id, action, rng)))
            }
            None => return,
        };

        match outcome {
            Ok(Ok(effects)) => self.apply(effects),
            Ok(Err(rejected)) => {
                tracing::debug!(room = %self.room.code(), %player_id, reason = %rejected, "action rejected");
                self.send_error(player_id, &rejected);
            }
            Err(payload) => self.abort_game(panic_message(payload)),
        }
    }

    fn handle_disconnect(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        let departure = self.room.mark_disconnected(player_id)?;
        self.topic.unsubscribe(&player_id);

        tracing::info!(room = %self.room.code(), %player_id, "player disconnected");
        if let Some(host) = departure.new_host {
            tracing::info!(room = %self.room.code(), %host, "host reassigned");
        }

        if self.room.state() == RoomState::Playing {
            if let Some(game) = self.game.as_mut() {
                match panic::catch_unwind(AssertUnwindSafe(|| game.on_player_disconnect(player_id))) {
                    Ok(effects) => self.apply(effects),
                    Err(payload) => self.abort_game(panic_message(payload)),
                }
            }
        }

        self.broadcast_snapshot();

        if departure.room_empty {
            tracing::info!(
                room = %self.room.code(),
                grace_secs = self.config.empty_room_grace.as_secs(),
                "room empty, scheduling expiry"
            );
            self.timers
                .schedule(RoomTimer::Expire, self.config.empty_room_grace);
        }
        Ok(())
    }

    /// Ends the running game after a fault inside game code.
    fn abort_game(&mut self, reason: String) {
        tracing::warn!(room = %self.room.code(), %reason, "game panicked, aborting");
        self.game = None;
        self.cancel_game_timers();
        self.room.transition(RoomState::Ended);
        self.topic.publish(&ServerEvent::GameAborted {
            reason: "The game hit an internal error".to_string(),
        });
        self.broadcast_snapshot();
    }

    /// Moves the room to `Ended` once the game reports it is over.
    fn check_finished(&mut self) {
        if self.room.state() != RoomState::Playing {
            return;
        }
        let finished = self.game.as_ref().is_some_and(G::is_finished);
        if finished {
            self.cancel_game_timers();
            self.room.transition(RoomState::Ended);
            tracing::info!(room = %self.room.code(), "game finished");
            self.broadcast_snapshot();
        }
    }

    /// Delivers messages and applies timer operations.
    fn apply(&mut self, effects: Effects<G::Event, G::Timer>) {
        let (messages, timers) = effects.into_parts();
        for (recipient, event) in messages {
            let event = ServerEvent::Game(event);
            match recipient {
                Recipient::All => {
                    self.topic.publish(&event);
                }
                Recipient::Player(player_id) => {
                    self.topic.send_to(&player_id, event);
                }
                Recipient::AllExcept(excluded) => {
                    self.topic.publish_except(&excluded, &event);
                }
            }
        }
        for op in timers {
            match op {
                TimerOp::Schedule { timer, after } => {
                    self.timers.schedule(RoomTimer::Game(timer), after);
                }
                TimerOp::Cancel(timer) => {
                    self.timers.cancel(&RoomTimer::Game(timer));
                }
                TimerOp::CancelAll => {
                    self.cancel_game_timers();
                }
            }
        }
    }

    fn cancel_game_timers(&mut self) {
        self.timers
            .cancel_where(|key| matches!(key, RoomTimer::Game(_)));
    }

    fn broadcast_snapshot(&self) {
        self.topic
            .publish(&ServerEvent::RoomUpdate(self.room.snapshot()));
    }

    fn send_error(&self, player_id: PlayerId, err: &impl std::fmt::Display) {
        self.topic.send_to(
            &player_id,
            ServerEvent::Error {
                message: err.to_string(),
            },
        );
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Spawns a room actor with `host` as its first player and returns a
/// handle to it. The host receives `room-created` and a `room-update`.
pub(crate) fn spawn_room<G: GameLogic>(
    code: RoomCode,
    kind: GameKind,
    host: PlayerId,
    host_name: String,
    host_sender: PlayerSender<G>,
    config: RoomConfig,
) -> RoomHandle<G> {
    let (tx, rx) = mpsc::channel(config.channel_size);

    let rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let room = Room::new(code.clone(), kind, G::limits(kind), host, host_name);
    let mut topic = Topic::new(code.as_str());
    topic.subscribe(host, host_sender);
    topic.send_to(
        &host,
        ServerEvent::RoomCreated {
            room_code: code.clone(),
            player_id: host,
        },
    );
    topic.publish(&ServerEvent::RoomUpdate(room.snapshot()));

    let actor = RoomActor::<G> {
        room,
        topic,
        game: None,
        timers: Timers::new(),
        rng,
        config,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
