//! Room configuration and per-game player limits.

use std::time::Duration;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room the registry spawns.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// How long a room with nobody connected is kept before it is
    /// destroyed. Leaves a window for a reconnect flow.
    pub empty_room_grace: Duration,

    /// Capacity of each room actor's command channel. When it fills,
    /// senders wait (backpressure) instead of growing memory.
    pub channel_size: usize,

    /// Fixed RNG seed for every room. `None` seeds from the OS.
    /// Only tests should set this.
    pub rng_seed: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            empty_room_grace: Duration::from_secs(5 * 60),
            channel_size: 64,
            rng_seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerLimits
// ---------------------------------------------------------------------------

/// Inclusive bounds on how many seated players a game supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLimits {
    pub min: usize,
    pub max: usize,
}

impl PlayerLimits {
    /// Limits used by games without their own table: 3 to 16 players.
    pub const GENERIC: PlayerLimits = PlayerLimits::new(3, 16);

    /// Creates limits. `min` must not exceed `max`.
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Returns `true` if `count` players can play.
    pub fn contains(&self, count: usize) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.empty_room_grace, Duration::from_secs(300));
        assert_eq!(config.channel_size, 64);
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn test_player_limits_are_inclusive() {
        let limits = PlayerLimits::new(5, 15);
        assert!(!limits.contains(4));
        assert!(limits.contains(5));
        assert!(limits.contains(15));
        assert!(!limits.contains(16));
        assert_eq!(PlayerLimits::GENERIC.min, 3);
    }
}
