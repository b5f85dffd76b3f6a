//! Room-scoped publish/subscribe fan-out.
//!
//! A [`Topic`] is the set of outbound queues for everyone listening on one
//! room code. The owner publishes to the whole topic or to a single
//! subscriber; delivery into a closed queue is dropped silently, because a
//! gone subscriber is the connection handler's concern, not the sender's.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tokio::sync::mpsc;

/// Outbound queue for one subscriber.
pub type Subscriber<M> = mpsc::UnboundedSender<M>;

/// Fan-out of messages of type `M` to subscribers keyed by `K`.
pub struct Topic<K, M> {
    name: String,
    subscribers: HashMap<K, Subscriber<M>>,
}

impl<K, M> Topic<K, M>
where
    K: Eq + Hash + Copy + fmt::Display,
    M: Clone,
{
    /// Creates an empty topic.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: HashMap::new(),
        }
    }

    /// The topic's name (the room code it is scoped to).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds or replaces a subscriber's queue.
    pub fn subscribe(&mut self, key: K, queue: Subscriber<M>) {
        if self.subscribers.insert(key, queue).is_some() {
            tracing::debug!(topic = %self.name, subscriber = %key, "subscriber queue replaced");
        }
    }

    /// Removes a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, key: &K) -> bool {
        self.subscribers.remove(key).is_some()
    }

    /// Returns `true` if `key` is subscribed.
    pub fn contains(&self, key: &K) -> bool {
        self.subscribers.contains_key(key)
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns `true` if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Sends `msg` to every subscriber. Returns how many queues accepted it.
    pub fn publish(&self, msg: &M) -> usize {
        self.subscribers
            .values()
            .filter(|queue| queue.send(msg.clone()).is_ok())
            .count()
    }

    /// Sends `msg` to every subscriber except `excluded`.
    pub fn publish_except(&self, excluded: &K, msg: &M) -> usize {
        self.subscribers
            .iter()
            .filter(|(key, _)| *key != excluded)
            .filter(|(_, queue)| queue.send(msg.clone()).is_ok())
            .count()
    }

    /// Sends `msg` to one subscriber. Returns `false` if the subscriber is
    /// unknown or its queue is closed.
    pub fn send_to(&self, key: &K, msg: M) -> bool {
        match self.subscribers.get(key) {
            Some(queue) => queue.send(msg).is_ok(),
            None => false,
        }
    }

    /// Drops subscribers whose receiving side has gone away.
    /// Returns the keys that were removed.
    pub fn prune_closed(&mut self) -> Vec<K> {
        let closed: Vec<K> = self
            .subscribers
            .iter()
            .filter(|(_, queue)| queue.is_closed())
            .map(|(key, _)| *key)
            .collect();
        for key in &closed {
            self.subscribers.remove(key);
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic() -> Topic<u64, &'static str> {
        Topic::new("ROOM42")
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let mut t = topic();
        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        t.subscribe(1, a_tx);
        t.subscribe(2, b_tx);

        assert_eq!(t.publish(&"hello"), 2);
        assert_eq!(a_rx.try_recv().unwrap(), "hello");
        assert_eq!(b_rx.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_send_to_only_reaches_target() {
        let mut t = topic();
        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        t.subscribe(1, a_tx);
        t.subscribe(2, b_tx);

        assert!(t.send_to(&2, "secret"));
        assert!(a_rx.try_recv().is_err());
        assert_eq!(b_rx.try_recv().unwrap(), "secret");
        assert!(!t.send_to(&3, "nobody"));
    }

    #[test]
    fn test_publish_except_skips_excluded() {
        let mut t = topic();
        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        t.subscribe(1, a_tx);
        t.subscribe(2, b_tx);

        assert_eq!(t.publish_except(&1, &"moved"), 1);
        assert!(a_rx.try_recv().is_err());
        assert_eq!(b_rx.try_recv().unwrap(), "moved");
    }

    #[test]
    fn test_closed_queues_are_skipped_and_pruned() {
        let mut t = topic();
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, _b_rx) = mpsc::unbounded_channel();
        t.subscribe(1, a_tx);
        t.subscribe(2, b_tx);
        drop(a_rx);

        assert_eq!(t.publish(&"ping"), 1);
        assert_eq!(t.prune_closed(), vec![1]);
        assert_eq!(t.len(), 1);
        assert!(!t.contains(&1));
    }

    #[test]
    fn test_unsubscribe() {
        let mut t = topic();
        let (tx, _rx) = mpsc::unbounded_channel();
        t.subscribe(7, tx);
        assert!(t.unsubscribe(&7));
        assert!(!t.unsubscribe(&7));
        assert!(t.is_empty());
        assert_eq!(t.name(), "ROOM42");
    }
}
