use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    /// Calls fail fast until the cool-down has elapsed.
    Open,
    /// One probe call is let through; its result decides Closed or Open.
    HalfOpen,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit [{name}] open, retry in {retry_in:?}")]
    Open { name: String, retry_in: Duration },

    #[error(transparent)]
    Inner(E),
}

struct BreakerState {
    state: CircuitState,
    consecutive_failures: usize,
    opened_at: Option<Instant>,
}

/// Guards a remote endpoint against hammering while it is down.
///
/// Only errors the caller classifies as outages count towards the threshold,
/// so a refused credential or a rejected order never opens the circuit.
pub struct CircuitBreaker {
    name: String,
    failure_threshold: usize,
    cool_down: Duration,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: usize, cool_down: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            cool_down,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Runs `call`, counting every error as an outage.
    pub async fn call<F, T, E>(&self, call: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.call_classified(call, |_| true).await
    }

    /// Runs `call`; `is_outage` decides which errors trip the breaker.
    pub async fn call_classified<F, T, E, P>(
        &self,
        call: F,
        is_outage: P,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        self.admit().await?;

        match call.await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(e) => {
                if is_outage(&e) {
                    self.record_failure().await;
                } else {
                    self.record_success().await;
                }
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    async fn admit<E>(&self) -> Result<(), CircuitBreakerError<E>> {
        let mut inner = self.inner.lock().await;
        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
        if elapsed >= self.cool_down {
            info!("CircuitBreaker [{}]: cool-down elapsed, probing", self.name);
            inner.state = CircuitState::HalfOpen;
            Ok(())
        } else {
            Err(CircuitBreakerError::Open {
                name: self.name.clone(),
                retry_in: self.cool_down - elapsed,
            })
        }
    }

    async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == CircuitState::HalfOpen {
            info!("CircuitBreaker [{}]: probe succeeded, closing", self.name);
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures += 1;

        let trip = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.failure_threshold,
            CircuitState::Open => false,
        };

        if trip {
            warn!(
                "CircuitBreaker [{}]: opening after {} consecutive failures",
                self.name, inner.consecutive_failures
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }
}
