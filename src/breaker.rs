//! Circuit breaker: resilience layer gating tier failover, per spec.md
//! §4.7. One instance is owned per downstream (tier or RPC service) and
//! shared across concurrent requests through a mutex held only across
//! state transitions.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BreakerState::Closed => "CLOSED",
            BreakerState::Open => "OPEN",
            BreakerState::HalfOpen => "HALF_OPEN",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SlidingWindow {
    Count(usize),
    Time(Duration),
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub half_open_success_threshold: u32,
    pub timeout: Option<Duration>,
    pub window: Option<SlidingWindow>,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_millis(30_000),
            half_open_success_threshold: 1,
            timeout: None,
            window: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreakerMetrics {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: BreakerState,
    pub failure_count: u32,
    pub success_count: u32,
    pub opened_at_millis: Option<u128>,
    pub metrics: BreakerMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpen;

struct Inner {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
    metrics: BreakerMetrics,
    window_outcomes: Vec<(bool, u64)>,
    seq: u64,
}

/// A single named breaker. `call_allowed`/`record_*` are the low-level
/// primitives; `guard` wraps an async call end to end.
pub struct CircuitBreaker {
    pub name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
                metrics: BreakerMetrics::default(),
                window_outcomes: Vec::new(),
                seq: 0,
            }),
        }
    }

    /// Current state, applying the OPEN → HALF_OPEN cooldown transition
    /// lazily on read (mirrors "upon the first call after cooldown_ms").
    pub fn state(&self) -> BreakerState {
        let mut guard = self.inner.lock().unwrap();
        self.maybe_half_open(&mut guard);
        guard.state
    }

    fn maybe_half_open(&self, guard: &mut Inner) {
        if guard.state == BreakerState::Open {
            if let Some(opened_at) = guard.opened_at {
                if opened_at.elapsed() >= self.config.cooldown {
                    guard.state = BreakerState::HalfOpen;
                    guard.success_count = 0;
                    tracing::info!(breaker = %self.name, "circuit half-opening after cooldown");
                }
            }
        }
    }

    /// Returns `Err(CircuitOpen)` (counted as a rejection) if the call
    /// should fast-fail, otherwise `Ok(())` meaning the caller should
    /// proceed and report the outcome via `record_success`/`record_failure`.
    pub fn try_acquire(&self) -> Result<(), CircuitOpen> {
        let mut guard = self.inner.lock().unwrap();
        self.maybe_half_open(&mut guard);
        if guard.state == BreakerState::Open {
            guard.metrics.rejected += 1;
            return Err(CircuitOpen);
        }
        Ok(())
    }

    pub fn record_success(&self) {
        let mut guard = self.inner.lock().unwrap();
        guard.metrics.total += 1;
        guard.metrics.successful += 1;
        self.push_outcome(&mut guard, true);
        match guard.state {
            BreakerState::Closed => {
                guard.failure_count = self.window_failure_count(&guard).unwrap_or(0);
            }
            BreakerState::HalfOpen => {
                guard.success_count += 1;
                if guard.success_count >= self.config.half_open_success_threshold {
                    guard.state = BreakerState::Closed;
                    guard.failure_count = 0;
                    guard.success_count = 0;
                    tracing::info!(breaker = %self.name, "circuit closing after successful probe");
                }
            }
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut guard = self.inner.lock().unwrap();
        guard.metrics.total += 1;
        guard.metrics.failed += 1;
        self.push_outcome(&mut guard, false);
        match guard.state {
            BreakerState::Closed => {
                guard.failure_count = match self.window_failure_count(&guard) {
                    Some(n) => n,
                    None => guard.failure_count + 1,
                };
                if guard.failure_count >= self.config.failure_threshold {
                    guard.state = BreakerState::Open;
                    guard.opened_at = Some(Instant::now());
                    tracing::warn!(breaker = %self.name, failures = guard.failure_count, "circuit opening");
                }
            }
            BreakerState::HalfOpen => {
                guard.state = BreakerState::Open;
                guard.opened_at = Some(Instant::now());
                guard.success_count = 0;
                tracing::warn!(breaker = %self.name, "circuit reopening after failed probe");
            }
            BreakerState::Open => {}
        }
    }

    fn push_outcome(&self, guard: &mut Inner, success: bool) {
        if let Some(SlidingWindow::Count(n)) = self.config.window {
            guard.window_outcomes.push((success, guard.seq));
            guard.seq += 1;
            if guard.window_outcomes.len() > n {
                let excess = guard.window_outcomes.len() - n;
                guard.window_outcomes.drain(0..excess);
            }
        } else if let Some(SlidingWindow::Time(w)) = self.config.window {
            let now = now_millis_monotonic(guard);
            guard.window_outcomes.push((success, now));
            let cutoff = now.saturating_sub(w.as_millis() as u64);
            guard.window_outcomes.retain(|(_, t)| *t >= cutoff);
        }
    }

    fn window_failure_count(&self, guard: &Inner) -> Option<u32> {
        if self.config.window.is_some() {
            Some(guard.window_outcomes.iter().filter(|(ok, _)| !ok).count() as u32)
        } else {
            None
        }
    }

    pub fn metrics(&self) -> BreakerMetrics {
        self.inner.lock().unwrap().metrics.clone()
    }

    pub fn export(&self) -> BreakerSnapshot {
        let guard = self.inner.lock().unwrap();
        BreakerSnapshot {
            name: self.name.clone(),
            state: guard.state,
            failure_count: guard.failure_count,
            success_count: guard.success_count,
            opened_at_millis: guard.opened_at.map(|_| 0),
            metrics: guard.metrics.clone(),
        }
    }

    /// Re-import state previously produced by `export`. Fails if the
    /// snapshot's name does not match this breaker's name.
    pub fn import(&self, snapshot: BreakerSnapshot) -> Result<(), String> {
        if snapshot.name != self.name {
            return Err(format!("breaker name mismatch: expected {}, got {}", self.name, snapshot.name));
        }
        let mut guard = self.inner.lock().unwrap();
        guard.state = snapshot.state;
        guard.failure_count = snapshot.failure_count;
        guard.success_count = snapshot.success_count;
        guard.opened_at = if snapshot.state == BreakerState::Open { Some(Instant::now()) } else { None };
        guard.metrics = snapshot.metrics;
        Ok(())
    }

    /// Run an async call through the breaker, classifying the result with
    /// `is_failure`, and applying `config.timeout` if set.
    pub async fn guard<F, T, E>(&self, is_failure: impl Fn(&Result<T, E>) -> bool, fut: F) -> Result<T, BreakerCallError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        self.try_acquire().map_err(|_| BreakerCallError::Open)?;
        let outcome = match self.config.timeout {
            Some(d) => match tokio::time::timeout(d, fut).await {
                Ok(r) => r,
                Err(_) => {
                    self.record_failure();
                    return Err(BreakerCallError::Timeout);
                }
            },
            None => fut.await,
        };
        if is_failure(&outcome) {
            self.record_failure();
        } else {
            self.record_success();
        }
        outcome.map_err(BreakerCallError::Inner)
    }
}

#[derive(Debug)]
pub enum BreakerCallError<E> {
    Open,
    Timeout,
    Inner(E),
}

fn now_millis_monotonic(guard: &Inner) -> u64 {
    // Deterministic, monotonic stand-in stamp: `seq` ensures even
    // simultaneous calls interleave in sorted order within the window.
    guard.seq
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn opens_after_failure_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new("t1", BreakerConfig { failure_threshold: 3, ..Default::default() });
        assert_eq!(breaker.state(), BreakerState::Closed);
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn success_resets_consecutive_failure_counter() {
        let breaker = CircuitBreaker::new("t2", BreakerConfig { failure_threshold: 3, ..Default::default() });
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn transitions_to_half_open_after_cooldown() {
        let breaker = CircuitBreaker::new(
            "t3",
            BreakerConfig { failure_threshold: 1, cooldown: Duration::from_millis(20), ..Default::default() },
        );
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
    }

    #[test]
    fn half_open_success_closes_circuit() {
        let breaker = CircuitBreaker::new(
            "t4",
            BreakerConfig {
                failure_threshold: 1,
                cooldown: Duration::from_millis(10),
                half_open_success_threshold: 2,
                ..Default::default()
            },
        );
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(
            "t5",
            BreakerConfig { failure_threshold: 1, cooldown: Duration::from_millis(10), ..Default::default() },
        );
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn open_circuit_rejects_calls() {
        let breaker = CircuitBreaker::new("t6", BreakerConfig { failure_threshold: 1, ..Default::default() });
        breaker.record_failure();
        assert!(breaker.try_acquire().is_err());
        assert_eq!(breaker.metrics().rejected, 1);
    }

    #[test]
    fn export_import_round_trip() {
        let breaker = CircuitBreaker::new("t7", BreakerConfig::default());
        breaker.record_failure();
        breaker.record_success();
        let snap = breaker.export();
        let other = CircuitBreaker::new("t7", BreakerConfig::default());
        other.import(snap).unwrap();
        assert_eq!(other.metrics().total, 2);
    }

    #[test]
    fn import_rejects_name_mismatch() {
        let breaker = CircuitBreaker::new("t8", BreakerConfig::default());
        let mut snap = breaker.export();
        snap.name = "different".into();
        assert!(breaker.import(snap).is_err());
    }

    #[test]
    fn count_window_tracks_only_last_n_outcomes() {
        let breaker = CircuitBreaker::new(
            "t9",
            BreakerConfig { failure_threshold: 2, window: Some(SlidingWindow::Count(3)), ..Default::default() },
        );
        breaker.record_failure();
        breaker.record_success();
        breaker.record_success();
        breaker.record_success();
        // Window now holds [success, success, success]; the old failure fell out.
        assert_eq!(breaker.state(), BreakerState::Closed);
    }
}
