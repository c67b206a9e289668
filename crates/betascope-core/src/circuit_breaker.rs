//! Outage guard for one upstream host.
//!
//! The breaker sees one outcome per logical provider call, after retries.
//! Only outage-class failures ([`ProviderErrorKind::is_outage`]) count
//! towards tripping it; a "no such symbol" answer means the upstream is
//! healthy.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::provider::{ProviderError, ProviderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive outage calls that open the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before letting one through.
    pub cool_down: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cool_down: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Circuit {
    Closed { outages: u32 },
    Open { until: Instant },
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuit: Mutex<Circuit>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuit: Mutex::new(Circuit::Closed { outages: 0 }),
        }
    }

    /// Rejects the call while the circuit is open. Once the cool-down has
    /// passed the circuit goes half-open and calls are let through again.
    pub fn admit(&self, upstream: &str) -> Result<(), ProviderError> {
        let mut circuit = self.circuit.lock().expect("circuit lock is not poisoned");
        if let Circuit::Open { until } = *circuit {
            if Instant::now() < until {
                return Err(ProviderError::unavailable(format!(
                    "{upstream} circuit is open; skipping upstream call"
                )));
            }
            tracing::debug!(upstream, "circuit half-open, probing upstream");
            *circuit = Circuit::HalfOpen;
        }
        Ok(())
    }

    /// Feeds the outcome of one logical call back into the circuit.
    pub fn observe(&self, outcome: Result<(), ProviderErrorKind>) {
        let mut circuit = self.circuit.lock().expect("circuit lock is not poisoned");
        let outage = matches!(outcome, Err(kind) if kind.is_outage());
        *circuit = match (*circuit, outage) {
            (_, false) => Circuit::Closed { outages: 0 },
            (Circuit::Closed { outages }, true) if outages + 1 < self.config.failure_threshold => {
                Circuit::Closed {
                    outages: outages + 1,
                }
            }
            (Circuit::Open { until }, true) => Circuit::Open { until },
            (_, true) => {
                tracing::warn!(
                    cool_down_ms = self.config.cool_down.as_millis() as u64,
                    "circuit opened"
                );
                Circuit::Open {
                    until: Instant::now() + self.config.cool_down,
                }
            }
        };
    }

    pub fn state(&self) -> CircuitState {
        match *self.circuit.lock().expect("circuit lock is not poisoned") {
            Circuit::Closed { .. } => CircuitState::Closed,
            Circuit::Open { .. } => CircuitState::Open,
            Circuit::HalfOpen => CircuitState::HalfOpen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cool_down: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            cool_down,
        })
    }

    #[test]
    fn consecutive_outages_open_the_circuit() {
        let breaker = breaker(2, Duration::from_secs(60));

        breaker.observe(Err(ProviderErrorKind::Unavailable));
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.observe(Err(ProviderErrorKind::RateLimited));
        assert_eq!(breaker.state(), CircuitState::Open);

        let rejected = breaker.admit("yahoo").expect_err("open circuit rejects");
        assert_eq!(rejected.kind(), ProviderErrorKind::Unavailable);
    }

    #[test]
    fn answers_from_a_healthy_upstream_reset_the_count() {
        let breaker = breaker(2, Duration::from_secs(60));

        breaker.observe(Err(ProviderErrorKind::Unavailable));
        breaker.observe(Err(ProviderErrorKind::NotFound));
        breaker.observe(Err(ProviderErrorKind::Unavailable));
        breaker.observe(Err(ProviderErrorKind::Malformed));
        breaker.observe(Ok(()));

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.admit("yahoo").is_ok());
    }

    #[test]
    fn half_open_call_decides_the_next_state() {
        let breaker = breaker(1, Duration::from_millis(1));

        breaker.observe(Err(ProviderErrorKind::Unavailable));
        std::thread::sleep(Duration::from_millis(3));
        assert!(breaker.admit("yahoo").is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.observe(Err(ProviderErrorKind::Unavailable));
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(3));
        assert!(breaker.admit("yahoo").is_ok());
        breaker.observe(Ok(()));
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
