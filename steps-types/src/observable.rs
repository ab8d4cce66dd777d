//! Last-value caching multicast stream.
//!
//! An [`Observable`] keeps the most recent value and fans every new value out
//! to all subscribers. A new [`Subscription`] first yields the cached value
//! (if any) and then every later emission in publish order, so the order in
//! which consumers attach does not matter.
//!
//! Each emission carries a generation. [`Observable::publish_at`] refuses a
//! generation that is not newer than the last one, which lets producers that
//! evaluate concurrently publish out of order without a stale value winning.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

const DEFAULT_CAPACITY: usize = 64;

/// A value tagged with the generation it was published at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Versioned<T> {
    pub generation: u64,
    pub value: T,
}

struct State<T> {
    last: Option<Versioned<T>>,
    generation: u64,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    tx: broadcast::Sender<Versioned<T>>,
}

/// Multicast stream that replays its last value to new subscribers.
pub struct Observable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an observable whose subscribers may fall `capacity` emissions
    /// behind before they start skipping.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    last: None,
                    generation: 0,
                }),
                tx,
            }),
        }
    }

    /// Publishes `value` at the next generation and returns that generation.
    pub fn publish(&self, value: T) -> u64 {
        let mut state = self.lock();
        let generation = state.generation + 1;
        self.emit(&mut state, generation, value);
        generation
    }

    /// Publishes `value` only if `generation` is newer than the last
    /// published one. Returns whether the value was accepted.
    pub fn publish_at(&self, generation: u64, value: T) -> bool {
        let mut state = self.lock();
        if generation <= state.generation {
            return false;
        }
        self.emit(&mut state, generation, value);
        true
    }

    /// Most recently published value.
    pub fn latest(&self) -> Option<T> {
        self.lock().last.as_ref().map(|v| v.value.clone())
    }

    /// Generation of the most recent emission, `0` before the first one.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.tx.receiver_count()
    }

    /// Attaches a new consumer.
    pub fn subscribe(&self) -> Subscription<T> {
        // Snapshot and receiver are taken under the same lock as `emit`, so
        // the subscriber neither misses nor duplicates an emission.
        let state = self.lock();
        Subscription {
            pending: state.last.clone(),
            rx: self.shared.tx.subscribe(),
        }
    }

    fn emit(&self, state: &mut MutexGuard<'_, State<T>>, generation: u64, value: T) {
        let versioned = Versioned { generation, value };
        state.generation = generation;
        state.last = Some(versioned.clone());
        // No receivers is fine; the value stays cached.
        let _ = self.shared.tx.send(versioned);
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.shared.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// A consumer attached to an [`Observable`].
pub struct Subscription<T> {
    pending: Option<Versioned<T>>,
    rx: broadcast::Receiver<Versioned<T>>,
}

impl<T: Clone> Subscription<T> {
    /// Waits for the next value. Returns `None` once every handle to the
    /// observable has been dropped.
    pub async fn next(&mut self) -> Option<T> {
        self.next_versioned().await.map(|v| v.value)
    }

    /// Like [`next`](Self::next), keeping the generation.
    pub async fn next_versioned(&mut self) -> Option<Versioned<T>> {
        if let Some(v) = self.pending.take() {
            return Some(v);
        }
        loop {
            match self.rx.recv().await {
                Ok(v) => return Some(v),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "observable subscriber lagged, skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next value if one is already available.
    pub fn try_next(&mut self) -> Option<T> {
        if let Some(v) = self.pending.take() {
            return Some(v.value);
        }
        loop {
            match self.rx.try_recv() {
                Ok(v) => return Some(v.value),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "observable subscriber lagged, skipping ahead");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_observable_has_nothing_cached() {
        let obs: Observable<i64> = Observable::new();
        assert_eq!(obs.latest(), None);
        assert_eq!(obs.generation(), 0);
        assert_eq!(obs.subscribe().try_next(), None);
    }

    #[test]
    fn late_subscriber_sees_last_value_first() {
        let obs = Observable::new();
        obs.publish(1);
        obs.publish(6);

        let mut sub = obs.subscribe();
        assert_eq!(sub.try_next(), Some(6));
        assert_eq!(sub.try_next(), None);

        obs.publish(7);
        assert_eq!(sub.try_next(), Some(7));
    }

    #[test]
    fn every_subscriber_gets_every_emission() {
        let obs = Observable::new();
        let mut a = obs.subscribe();
        let mut b = obs.subscribe();
        obs.publish("x");
        obs.publish("y");

        assert_eq!(a.try_next(), Some("x"));
        assert_eq!(a.try_next(), Some("y"));
        assert_eq!(b.try_next(), Some("x"));
        assert_eq!(b.try_next(), Some("y"));
    }

    #[test]
    fn stale_generation_is_rejected() {
        let obs = Observable::new();
        assert!(obs.publish_at(5, 50));
        assert!(!obs.publish_at(4, 40));
        assert!(!obs.publish_at(5, 55));
        assert_eq!(obs.latest(), Some(50));
        assert!(obs.publish_at(6, 60));
        assert_eq!(obs.generation(), 6);
    }

    #[test]
    fn lagging_subscriber_skips_ahead() {
        let obs = Observable::with_capacity(2);
        let mut sub = obs.subscribe();
        for i in 0..5 {
            obs.publish(i);
        }
        assert_eq!(sub.try_next(), Some(3));
        assert_eq!(sub.try_next(), Some(4));
    }

    #[tokio::test]
    async fn next_waits_for_publish() {
        let obs = Observable::new();
        let mut sub = obs.subscribe();
        let publisher = obs.clone();
        tokio::spawn(async move {
            publisher.publish(42u32);
        });
        assert_eq!(sub.next().await, Some(42));
    }

    #[tokio::test]
    async fn next_ends_when_observable_dropped() {
        let obs: Observable<u8> = Observable::new();
        let mut sub = obs.subscribe();
        drop(obs);
        assert_eq!(sub.next().await, None);
    }
}
