//! `HuddleServer` builder and server loop.
//!
//! This is the entry point for running a Huddle server. It ties the layers
//! together: transport → protocol → room registry → room actors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use huddle_protocol::{Codec, JsonCodec};
use huddle_room::{GameLogic, RoomConfig, RoomRegistry};
use huddle_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{HuddleError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// The registry lock is only held for lookups and index updates; nothing
/// awaits a room's reply while holding it.
pub(crate) struct ServerState<G: GameLogic, C: Codec> {
    pub(crate) rooms: Mutex<RoomRegistry<G>>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
    pub(crate) started: Instant,
}

/// Builder for configuring and starting a Huddle server.
///
/// # Example
///
/// ```rust,ignore
/// use huddle::prelude::*;
///
/// let server = HuddleServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .idle_timeout(Duration::from_secs(45))
///     .build::<Party>()
///     .await?;
/// server.run().await
/// ```
pub struct HuddleServerBuilder {
    config: ServerConfig,
}

impl HuddleServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every room is spawned with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Sets how long a silent connection is kept open.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Sets how often stopped rooms are dropped from the registry.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Binds the listener and builds the server for game logic `G`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<G: GameLogic>(self) -> Result<HuddleServer<G, JsonCodec>, HuddleError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomRegistry::new(self.config.room.clone())),
            codec: JsonCodec,
            config: self.config,
            started: Instant::now(),
        });

        Ok(HuddleServer { transport, state })
    }
}

impl Default for HuddleServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Huddle server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct HuddleServer<G: GameLogic, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<G, C>>,
}

impl<G, C> HuddleServer<G, C>
where
    G: GameLogic,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns the registry sweep, then accepts incoming connections and
    /// spawns a handler task for each. Runs until the process is
    /// terminated.
    pub async fn run(mut self) -> Result<(), HuddleError> {
        tracing::info!(addr = %self.state.config.bind_addr, "Huddle server running");

        tokio::spawn(sweep_rooms(Arc::clone(&self.state)));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection::<G, C>(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Periodically drops rooms whose actor has stopped.
async fn sweep_rooms<G: GameLogic, C: Codec>(state: Arc<ServerState<G, C>>) {
    let mut interval = tokio::time::interval(state.config.sweep_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let removed = state.rooms.lock().await.sweep();
        if !removed.is_empty() {
            tracing::debug!(removed = removed.len(), "swept stopped rooms");
        }
    }
}
