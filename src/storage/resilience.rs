//! Circuit breaking for the durable cache store.
//!
//! An unreachable cache must never slow down aggregation. Once the store has
//! failed `failure_threshold` times in a row the breaker opens and every call
//! is rejected immediately with [`Error::CacheUnavailable`], which the cache
//! layer treats as a miss. After `reset_timeout` one trial call is let
//! through; its outcome closes or re-opens the circuit. A trial whose caller
//! goes away before it finishes counts as failed, so the circuit re-opens
//! and a later call gets a fresh trial.
//!
//! ```text
//! +--------+     failures >= threshold     +------+
//! | Closed | --------------------------->  | Open |
//! +--------+                               +------+
//!     ^                                        |
//!     |  success                               | timeout elapsed
//!     |                                        v
//!     +--------------------------------  +-----------+
//!                                        | Half-Open |
//!                                        +-----------+
//! ```

use super::traits::KeyValueStore;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial call.
    pub reset_timeout_ms: u64,
    /// Trial calls allowed while half-open.
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
            half_open_max_calls: 1,
        }
    }
}

impl BreakerConfig {
    /// Sets the failure threshold.
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the reset timeout in milliseconds.
    #[must_use]
    pub const fn with_reset_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.reset_timeout_ms = timeout_ms;
        self
    }
}

#[derive(Debug)]
enum BreakerState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { attempts: u32 },
}

/// Closed/open/half-open state machine.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: BreakerState,
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_max_calls: u32,
    backend_name: &'static str,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    #[must_use]
    pub fn new(config: &BreakerConfig, backend_name: &'static str) -> Self {
        Self {
            state: BreakerState::Closed { failures: 0 },
            failure_threshold: config.failure_threshold.max(1),
            reset_timeout: Duration::from_millis(config.reset_timeout_ms),
            half_open_max_calls: config.half_open_max_calls.max(1),
            backend_name,
        }
    }

    /// Returns `true` if a call may proceed.
    pub fn allow(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { opened_at } => {
                if opened_at.elapsed() >= self.reset_timeout {
                    tracing::info!(backend = self.backend_name, "cache breaker half-open");
                    self.state = BreakerState::HalfOpen { attempts: 1 };
                    true
                } else {
                    false
                }
            },
            BreakerState::HalfOpen { ref mut attempts } => {
                if *attempts >= self.half_open_max_calls {
                    false
                } else {
                    *attempts += 1;
                    true
                }
            },
        }
    }

    /// Records a success and closes the circuit.
    pub fn on_success(&mut self) {
        if !matches!(self.state, BreakerState::Closed { failures: 0 }) {
            tracing::info!(backend = self.backend_name, "cache breaker closed");
        }
        self.state = BreakerState::Closed { failures: 0 };
    }

    /// Records a failure. Returns `true` if the circuit just opened.
    pub fn on_failure(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { ref mut failures } => {
                *failures += 1;
                if *failures < self.failure_threshold {
                    return false;
                }
                tracing::warn!(
                    backend = self.backend_name,
                    failures = *failures,
                    "cache breaker opened after consecutive failures"
                );
            },
            BreakerState::HalfOpen { .. } => {
                tracing::warn!(backend = self.backend_name, "cache breaker re-opened");
            },
            BreakerState::Open { .. } => return false,
        }
        self.state = BreakerState::Open {
            opened_at: Instant::now(),
        };
        true
    }

    /// Records a call dropped before it finished. Returns `true` if the
    /// circuit just re-opened.
    ///
    /// Only a half-open trial counts; cancelled calls on a closed circuit
    /// say nothing about the backend.
    pub fn on_abandoned(&mut self) -> bool {
        match self.state {
            BreakerState::HalfOpen { .. } => self.on_failure(),
            BreakerState::Closed { .. } | BreakerState::Open { .. } => false,
        }
    }

    /// Numeric state for the gauge: 0 closed, 1 open, 2 half-open.
    #[must_use]
    pub const fn state_value(&self) -> u8 {
        match self.state {
            BreakerState::Closed { .. } => 0,
            BreakerState::Open { .. } => 1,
            BreakerState::HalfOpen { .. } => 2,
        }
    }
}

/// Key/value store wrapper that stops calling a failing backend.
#[derive(Debug)]
pub struct ResilientKeyValueStore<S> {
    inner: S,
    breaker: Mutex<CircuitBreaker>,
}

impl<S: KeyValueStore> ResilientKeyValueStore<S> {
    /// Wraps `inner` with a breaker configured by `config`.
    #[must_use]
    pub fn new(inner: S, config: &BreakerConfig) -> Self {
        let breaker = CircuitBreaker::new(config, inner.name());
        Self {
            inner,
            breaker: Mutex::new(breaker),
        }
    }

    /// Returns the breaker state (0 closed, 1 open, 2 half-open).
    #[must_use]
    pub fn state_value(&self) -> u8 {
        self.breaker().state_value()
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn admit(&self, operation: &'static str) -> Result<Admission<'_, S>> {
        let mut breaker = self.breaker();
        if breaker.allow() {
            return Ok(Admission {
                store: self,
                settled: false,
            });
        }
        let state = breaker.state_value();
        drop(breaker);
        self.record_state(state);
        Err(Error::cache(
            operation,
            format!("circuit open for '{}'", self.inner.name()),
        ))
    }

    fn settle<T>(&self, result: &Result<T>) {
        let mut breaker = self.breaker();
        let tripped = match result {
            Ok(_) => {
                breaker.on_success();
                false
            },
            Err(_) => breaker.on_failure(),
        };
        let state = breaker.state_value();
        drop(breaker);
        self.after_transition(state, tripped);
    }

    fn abandon(&self) {
        let mut breaker = self.breaker();
        let tripped = breaker.on_abandoned();
        let state = breaker.state_value();
        drop(breaker);
        self.after_transition(state, tripped);
    }

    fn after_transition(&self, state: u8, tripped: bool) {
        self.record_state(state);
        if tripped {
            metrics::counter!("newsroom_kv_breaker_trips_total", "backend" => self.inner.name())
                .increment(1);
        }
    }

    fn record_state(&self, state: u8) {
        metrics::gauge!("newsroom_kv_breaker_state", "backend" => self.inner.name())
            .set(f64::from(state));
    }
}

/// A call let through by the breaker.
///
/// Dropping it unsettled, as happens when the caller's future is cancelled,
/// records the call as abandoned.
struct Admission<'a, S: KeyValueStore> {
    store: &'a ResilientKeyValueStore<S>,
    settled: bool,
}

impl<S: KeyValueStore> Admission<'_, S> {
    fn settle<T>(mut self, result: &Result<T>) {
        self.settled = true;
        self.store.settle(result);
    }
}

impl<S: KeyValueStore> Drop for Admission<'_, S> {
    fn drop(&mut self) {
        if !self.settled {
            self.store.abandon();
        }
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for ResilientKeyValueStore<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let admission = self.admit("set")?;
        let result = self.inner.set_with_ttl(key, value, ttl).await;
        admission.settle(&result);
        result
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let admission = self.admit("get")?;
        let result = self.inner.get(key).await;
        admission.settle(&result);
        result
    }
}
