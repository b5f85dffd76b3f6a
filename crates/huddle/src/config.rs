//! Server configuration.

use std::time::Duration;

use huddle_room::RoomConfig;

/// Settings for a [`HuddleServer`](crate::HuddleServer).
///
/// Usually assembled through [`HuddleServerBuilder`](crate::HuddleServerBuilder).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// A connection that sends nothing for this long is closed. Clients
    /// keep it open with `heartbeat` events.
    pub idle_timeout: Duration,

    /// How often the registry drops rooms whose actor has stopped.
    pub sweep_interval: Duration,

    /// Handed to every room the registry spawns.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(60),
            room: RoomConfig::default(),
        }
    }
}
