use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    /// Failing fast until the reset timeout passes.
    Open,
    /// One trial call at a time; a stalled trial frees its slot after the reset timeout.
    HalfOpen,
}

#[derive(Debug)]
struct Breaker {
    state: CircuitState,
    opened_at: Option<Instant>,
    trial_started: Option<Instant>,
}

/// Guards calls to one collaborator service.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    breaker: RwLock<Breaker>,
    failure_count: AtomicUsize,
    failure_threshold: usize,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(name: &str, threshold: usize, reset_timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            breaker: RwLock::new(Breaker {
                state: CircuitState::Closed,
                opened_at: None,
                trial_started: None,
            }),
            failure_count: AtomicUsize::new(0),
            failure_threshold: threshold.max(1),
            reset_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn state(&self) -> CircuitState {
        self.breaker.read().await.state
    }

    /// Whether a call may go out now.
    pub async fn check(&self) -> bool {
        if self.breaker.read().await.state == CircuitState::Closed {
            return true;
        }
        let mut breaker = self.breaker.write().await;
        match breaker.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                let slot_free = breaker
                    .trial_started
                    .map_or(true, |at| at.elapsed() >= self.reset_timeout);
                if slot_free {
                    breaker.trial_started = Some(Instant::now());
                }
                slot_free
            }
            CircuitState::Open => {
                let ready = breaker
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.reset_timeout);
                if ready {
                    breaker.state = CircuitState::HalfOpen;
                    breaker.trial_started = Some(Instant::now());
                    tracing::info!("Circuit Breaker [{}] moving to Half-Open", self.name);
                }
                ready
            }
        }
    }

    pub async fn record_success(&self) {
        self.failure_count.store(0, Ordering::SeqCst);
        let mut breaker = self.breaker.write().await;
        if breaker.state != CircuitState::Closed {
            breaker.state = CircuitState::Closed;
            breaker.opened_at = None;
            breaker.trial_started = None;
            tracing::info!("Circuit Breaker [{}] recovered to Closed", self.name);
        }
    }

    pub async fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut breaker = self.breaker.write().await;
        if count >= self.failure_threshold || breaker.state == CircuitState::HalfOpen {
            breaker.state = CircuitState::Open;
            breaker.opened_at = Some(Instant::now());
            breaker.trial_started = None;
            tracing::error!("Circuit Breaker [{}] TRIPPED to Open. Failures: {}", self.name, count);
        }
    }
}
