use crate::errors::ToolError;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub retry_in_secs: Option<u64>,
}

/// Three-state failure isolator for the vendor API.
///
/// Entry checks and every transition run under one lock, so the
/// OPEN -> HALF_OPEN flip happens exactly once per open period no matter
/// how many callers observe the expired timeout together.
pub struct CircuitBreaker {
    failure_threshold: u32,
    open_timeout: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            open_timeout,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
            }),
        }
    }

    /// Admission check before the retried HTTP call. Rejects with
    /// `CircuitOpen` while the open timeout has not elapsed; the first
    /// caller past the timeout flips the state to half-open and proceeds.
    pub fn check(&self) -> Result<(), ToolError> {
        let mut guard = self.lock();
        match guard.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = guard
                    .last_failure_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.open_timeout {
                    guard.state = CircuitState::HalfOpen;
                    return Ok(());
                }
                let retry_in = (self.open_timeout - elapsed).as_secs().max(1);
                Err(ToolError::circuit_open(format!(
                    "Upstream temporarily unavailable, retry in {}s",
                    retry_in
                )))
            }
        }
    }

    pub fn record_success(&self) {
        let mut guard = self.lock();
        match guard.state {
            CircuitState::HalfOpen => {
                guard.state = CircuitState::Closed;
                guard.consecutive_failures = 0;
            }
            CircuitState::Closed => {
                guard.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut guard = self.lock();
        guard.consecutive_failures += 1;
        guard.last_failure_at = Some(Instant::now());
        match guard.state {
            CircuitState::HalfOpen => {
                guard.state = CircuitState::Open;
            }
            CircuitState::Closed => {
                if guard.consecutive_failures >= self.failure_threshold {
                    guard.state = CircuitState::Open;
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let guard = self.lock();
        let retry_in_secs = match guard.state {
            CircuitState::Open => guard.last_failure_at.map(|at| {
                let elapsed = at.elapsed();
                if elapsed >= self.open_timeout {
                    0
                } else {
                    (self.open_timeout - elapsed).as_secs()
                }
            }),
            _ => None,
        };
        BreakerSnapshot {
            state: guard.state,
            consecutive_failures: guard.consecutive_failures,
            failure_threshold: self.failure_threshold,
            retry_in_secs,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }
}
