//! Per-key coordination.
//!
//! - [`KeyedLock`] hands out one `tokio` mutex per string key. History
//!   read-modify-write cycles for the same user run one at a time inside
//!   this process. Slots are held weakly and pruned once nobody holds or
//!   awaits them, so the map only ever contains keys that are contended.
//! - [`SingleFlight`] tracks in-flight cache fills. The first caller for a
//!   cold key leads the fetch; callers arriving meanwhile follow it and
//!   receive the leader's outcome, success or error, over a `watch` channel
//!   without touching the cache or the provider.

use crate::Error;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, watch};

/// Guard for a keyed section. The section ends when the guard drops.
pub type KeyedGuard = OwnedMutexGuard<()>;

/// A set of async mutexes addressed by key.
#[derive(Debug, Default)]
pub struct KeyedLock {
    slots: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl KeyedLock {
    /// Creates an empty lock set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyedGuard {
        let slot = self.slot(key);
        slot.lock_owned().await
    }

    /// Tries to enter the section for `key` without waiting.
    ///
    /// Returns `None` if another task currently holds it.
    pub fn try_lock(&self, key: &str) -> Option<KeyedGuard> {
        self.slot(key).try_lock_owned().ok()
    }

    /// Returns the number of keys with live holders or waiters.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        let mut slots = self.slots();
        slots.retain(|_, weak| weak.strong_count() > 0);
        slots.len()
    }

    /// Finds or creates the mutex for `key`, pruning dead slots.
    fn slot(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots();

        if let Some(existing) = slots.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        slots.retain(|_, weak| weak.strong_count() > 0);
        let fresh = Arc::new(AsyncMutex::new(()));
        slots.insert(key.to_string(), Arc::downgrade(&fresh));
        fresh
    }

    /// Acquires the slot map, recovering from poison.
    fn slots(&self) -> MutexGuard<'_, HashMap<String, Weak<AsyncMutex<()>>>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("keyed lock map was poisoned, recovering");
                poisoned.into_inner()
            },
        }
    }
}

/// Outcome a flight leader hands to its followers: the serialized value or
/// the error the fetch ended with.
pub type FlightOutcome = std::result::Result<Arc<str>, Error>;

type FlightSlot = watch::Receiver<Option<FlightOutcome>>;

/// In-flight work addressed by key.
#[derive(Debug, Default)]
pub struct SingleFlight {
    flights: Mutex<HashMap<String, FlightSlot>>,
}

/// A caller's role in the flight for one key.
#[derive(Debug)]
pub enum Flight<'a> {
    /// Runs the work and publishes its outcome.
    Leader(FlightLeader<'a>),
    /// Waits for the current leader.
    Follower(FlightFollower),
}

/// Handle of the caller running the work for a key.
///
/// Dropping it ends the flight. Followers of a leader that drops without
/// publishing see no outcome and join again.
#[derive(Debug)]
pub struct FlightLeader<'a> {
    group: &'a SingleFlight,
    key: String,
    tx: watch::Sender<Option<FlightOutcome>>,
}

/// Handle of a caller waiting on another caller's work.
#[derive(Debug)]
pub struct FlightFollower {
    rx: FlightSlot,
}

impl SingleFlight {
    /// Creates an empty flight group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Leads the flight for `key`, or follows the one already running.
    pub fn join(&self, key: &str) -> Flight<'_> {
        let mut flights = self.flights();
        if let Some(rx) = flights.get(key) {
            return Flight::Follower(FlightFollower { rx: rx.clone() });
        }
        let (tx, rx) = watch::channel(None);
        flights.insert(key.to_string(), rx);
        Flight::Leader(FlightLeader {
            group: self,
            key: key.to_string(),
            tx,
        })
    }

    /// Returns the number of keys with a running flight.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        self.flights().len()
    }

    fn flights(&self) -> MutexGuard<'_, HashMap<String, FlightSlot>> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FlightLeader<'_> {
    /// Hands `outcome` to every follower and ends the flight.
    pub fn publish(self, outcome: FlightOutcome) {
        // Followers may all have gone away; nobody left to tell.
        let _ = self.tx.send(Some(outcome));
    }
}

impl Drop for FlightLeader<'_> {
    fn drop(&mut self) {
        self.group.flights().remove(&self.key);
    }
}

impl FlightFollower {
    /// Waits for the leader's outcome.
    ///
    /// Returns `None` if the leader went away without publishing one.
    pub async fn outcome(mut self) -> Option<FlightOutcome> {
        self.rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|outcome| outcome.clone())
    }
}
