//! Cancellable keyed timers for Huddle room actors.
//!
//! Rooms advance phases on deadlines: a guess window closes, the next
//! round starts after a short pause, an empty room expires. Each of those
//! is a deferred re-entry into the room's own serialized command loop, so
//! the timers live *inside* the room actor rather than in detached tasks
//! that might fire after the room is gone.
//!
//! # Integration
//!
//! [`Timers`] sits in a room actor's `tokio::select!` loop next to the
//! command channel:
//!
//! ```ignore
//! let next = tokio::select! {
//!     cmd = receiver.recv() => Next::Command(cmd),
//!     key = timers.next_due() => Next::Timer(key),
//! };
//! ```
//!
//! With nothing scheduled, [`Timers::next_due`] pends forever and `select!`
//! only serves commands. Dropping the `Timers` (or calling
//! [`Timers::cancel_all`]) cancels everything; nothing outlives the room.
//!
//! # Keys
//!
//! A key names what the timer is for. Scheduling a key that is already
//! pending re-arms it instead of adding a second entry, so a key can fire
//! at most once per arming.

use std::fmt;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// A pending timer.
#[derive(Debug, Clone)]
struct Entry<K> {
    key: K,
    deadline: Instant,
    /// Arming order, used to break deadline ties.
    seq: u64,
}

/// Counters for the timers owned by one room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// Timers armed (including re-arms).
    pub scheduled: u64,
    /// Timers that fired.
    pub fired: u64,
    /// Timers cancelled before firing.
    pub cancelled: u64,
}

/// A set of pending deadlines, each identified by a key.
#[derive(Debug)]
pub struct Timers<K> {
    entries: Vec<Entry<K>>,
    next_seq: u64,
    stats: TimerStats,
}

impl<K> Default for Timers<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
            stats: TimerStats::default(),
        }
    }
}

impl<K> Timers<K>
where
    K: PartialEq + Clone + fmt::Debug,
{
    /// Creates an empty timer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `key` to fire `after` from now.
    ///
    /// If `key` is already pending its deadline is replaced.
    pub fn schedule(&mut self, key: K, after: Duration) {
        let deadline = Instant::now() + after;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.stats.scheduled += 1;

        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                debug!(?key, after_ms = after.as_millis() as u64, "timer re-armed");
                entry.deadline = deadline;
                entry.seq = seq;
            }
            None => {
                debug!(?key, after_ms = after.as_millis() as u64, "timer armed");
                self.entries.push(Entry { key, deadline, seq });
            }
        }
    }

    /// Disarms `key`. Returns `false` if it wasn't pending.
    pub fn cancel(&mut self, key: &K) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.key != key);
        let removed = self.entries.len() != before;
        if removed {
            self.stats.cancelled += 1;
            trace!(?key, "timer cancelled");
        }
        removed
    }

    /// Disarms every timer. Returns how many were pending.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.stats.cancelled += count as u64;
        if count > 0 {
            debug!(count, "all timers cancelled");
        }
        count
    }

    /// Disarms every timer whose key matches `pred`.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(&e.key));
        let count = before - self.entries.len();
        self.stats.cancelled += count as u64;
        count
    }

    /// Returns `true` if `key` is pending.
    pub fn is_scheduled(&self, key: &K) -> bool {
        self.entries.iter().any(|e| &e.key == key)
    }

    /// Time left until `key` fires, if pending.
    pub fn remaining(&self, key: &K) -> Option<Duration> {
        self.entries
            .iter()
            .find(|e| &e.key == key)
            .map(|e| e.deadline.saturating_duration_since(Instant::now()))
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counters since creation.
    pub fn stats(&self) -> TimerStats {
        self.stats
    }

    /// Waits for the earliest pending timer and returns its key.
    ///
    /// Pends forever while nothing is scheduled. Cancel-safe: if the
    /// future is dropped before the deadline, the timer stays armed.
    pub async fn next_due(&mut self) -> K {
        let Some((index, deadline)) = self.earliest() else {
            std::future::pending::<()>().await;
            unreachable!("pending() never resolves");
        };

        time::sleep_until(deadline).await;

        let entry = self.entries.swap_remove(index);
        self.stats.fired += 1;
        trace!(key = ?entry.key, "timer fired");
        entry.key
    }

    fn earliest(&self) -> Option<(usize, Instant)> {
        self.entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| (e.deadline, e.seq))
            .map(|(i, e)| (i, e.deadline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Key {
        RoundEnd(u32),
        Expire,
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_in_deadline_order() {
        let mut timers = Timers::new();
        timers.schedule(Key::Expire, Duration::from_secs(300));
        timers.schedule(Key::RoundEnd(1), Duration::from_secs(60));

        assert_eq!(timers.next_due().await, Key::RoundEnd(1));
        assert_eq!(timers.next_due().await, Key::Expire);
        assert!(timers.is_empty());
        assert_eq!(timers.stats().fired, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_deadline() {
        let mut timers = Timers::new();
        timers.schedule(Key::RoundEnd(1), Duration::from_secs(10));
        timers.schedule(Key::RoundEnd(1), Duration::from_secs(30));
        assert_eq!(timers.len(), 1);

        let start = Instant::now();
        assert_eq!(timers.next_due().await, Key::RoundEnd(1));
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let mut timers = Timers::new();
        timers.schedule(Key::RoundEnd(1), Duration::from_secs(5));
        timers.schedule(Key::RoundEnd(2), Duration::from_secs(10));
        assert!(timers.cancel(&Key::RoundEnd(1)));
        assert!(!timers.cancel(&Key::RoundEnd(1)));

        assert_eq!(timers.next_due().await, Key::RoundEnd(2));
        assert_eq!(timers.stats().cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_timers_pend_forever() {
        let mut timers: Timers<Key> = Timers::new();
        let result =
            tokio::time::timeout(Duration::from_secs(3600), timers.next_due()).await;
        assert!(result.is_err(), "nothing scheduled, nothing fires");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_keeps_timer_armed() {
        let mut timers = Timers::new();
        timers.schedule(Key::Expire, Duration::from_secs(60));

        let early =
            tokio::time::timeout(Duration::from_secs(1), timers.next_due()).await;
        assert!(early.is_err());
        assert!(timers.is_scheduled(&Key::Expire));
        assert!(timers.remaining(&Key::Expire).unwrap() <= Duration::from_secs(59));

        assert_eq!(timers.next_due().await, Key::Expire);
    }

    #[test]
    fn test_cancel_all_and_cancel_where() {
        let mut timers = Timers::new();
        timers.schedule(Key::RoundEnd(1), Duration::from_secs(1));
        timers.schedule(Key::RoundEnd(2), Duration::from_secs(1));
        timers.schedule(Key::Expire, Duration::from_secs(1));

        let removed = timers.cancel_where(|k| matches!(k, Key::RoundEnd(_)));
        assert_eq!(removed, 2);
        assert!(timers.is_scheduled(&Key::Expire));
        assert_eq!(timers.cancel_all(), 1);
        assert!(timers.is_empty());
        assert_eq!(timers.stats().cancelled, 3);
    }
}
