// Circuit breaker for the remote directive service. Counts consecutive
// transient failures and fails fast while the service looks down.

use crate::error::ClarifyError;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum State {
    /// Normal operation, counting consecutive failures.
    Closed { failures: u32 },
    /// Tripped; every call fails fast until the reset timeout elapses.
    Open { opened_at: Instant },
    /// Reset timeout elapsed; exactly one probe may run.
    HalfOpen { probe_in_flight: bool },
}

/// Consecutive-failure circuit breaker owned by one remote client.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<State>,
    threshold: u32,
    reset_after: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_after: Duration) -> Self {
        Self {
            state: Mutex::new(State::Closed { failures: 0 }),
            threshold: threshold.max(1),
            reset_after,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned breaker still holds a coherent state value.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current state, with an elapsed open window reported as half-open.
    pub fn state(&self) -> CircuitState {
        match *self.lock() {
            State::Closed { .. } => CircuitState::Closed,
            State::Open { opened_at } if opened_at.elapsed() >= self.reset_after => {
                CircuitState::HalfOpen
            }
            State::Open { .. } => CircuitState::Open,
            State::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        match *self.lock() {
            State::Closed { failures } => failures,
            State::Open { .. } | State::HalfOpen { .. } => self.threshold,
        }
    }

    /// Force the breaker back to closed with a zero failure count.
    pub fn reset(&self) {
        *self.lock() = State::Closed { failures: 0 };
    }

    /// Ask for permission to perform one network attempt.
    ///
    /// Fails with [`ClarifyError::CircuitOpen`] while open, and while a
    /// half-open probe is already in flight.
    pub fn try_acquire(&self) -> Result<Permit<'_>, ClarifyError> {
        let mut state = self.lock();
        match *state {
            State::Closed { .. } => Ok(Permit::new(self, false)),
            State::Open { opened_at } => {
                let elapsed = opened_at.elapsed();
                if elapsed >= self.reset_after {
                    info!("Circuit half-open, allowing probe request");
                    *state = State::HalfOpen {
                        probe_in_flight: true,
                    };
                    Ok(Permit::new(self, true))
                } else {
                    let remaining = self.reset_after - elapsed;
                    Err(ClarifyError::CircuitOpen {
                        retry_after_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                    })
                }
            }
            State::HalfOpen { probe_in_flight } => {
                if probe_in_flight {
                    Err(ClarifyError::CircuitOpen { retry_after_ms: 0 })
                } else {
                    *state = State::HalfOpen {
                        probe_in_flight: true,
                    };
                    Ok(Permit::new(self, true))
                }
            }
        }
    }

    fn on_success(&self) {
        let mut state = self.lock();
        let was_half_open = matches!(*state, State::HalfOpen { .. });
        *state = State::Closed { failures: 0 };
        if was_half_open {
            info!("Circuit recovered (half-open probe succeeded)");
        }
    }

    fn on_failure(&self) {
        let mut state = self.lock();
        let now = Instant::now();
        match *state {
            State::Closed { failures } => {
                let failures = failures.saturating_add(1);
                if failures >= self.threshold {
                    warn!(
                        failures,
                        reset_ms = u64::try_from(self.reset_after.as_millis()).unwrap_or(u64::MAX),
                        "Circuit tripped, remote calls will fail fast"
                    );
                    *state = State::Open { opened_at: now };
                } else {
                    *state = State::Closed { failures };
                }
            }
            State::HalfOpen { .. } => {
                warn!("Half-open probe failed, circuit re-tripped");
                *state = State::Open { opened_at: now };
            }
            State::Open { .. } => {}
        }
    }
}

/// Permission for a single attempt. Must be settled with
/// [`succeed`](Self::succeed) or [`fail`](Self::fail); an unsettled probe
/// permit (e.g. the call future was dropped) re-opens the circuit.
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn succeed(mut self) {
        self.settled = true;
        self.breaker.on_success();
    }

    pub fn fail(mut self) {
        self.settled = true;
        self.breaker.on_failure();
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.probe && !self.settled {
            self.breaker.on_failure();
        }
    }
}
