use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::order::{Order, OrderItem};

use super::{
    guard, EffectError, InventoryService, PaymentGateway, PaymentReceipt, ShipmentTicket,
    ShippingCarrier,
};

// ============================================================================
// Resilient Effect Clients
// ============================================================================
//
// `Resilient<S>` wraps any effect client with:
// - An optional per-attempt timeout
// - Exponential backoff retry, for transient (`Unavailable`) errors only
// - A circuit breaker that fails fast once the service keeps failing
//
// Unavailable and timed-out attempts count against the breaker. Rejections
// are answers: they are neither retried nor counted.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        Duration::from_millis((current.as_millis() as f64 * self.multiplier) as u64)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive faults (unavailable or timed out) before opening
    pub failure_threshold: u32,
    /// How long to stay open before letting a trial call through
    pub open_timeout: Duration,
    /// Successful trial calls needed to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

struct BreakerState {
    state: CircuitState,
    failures: u32,
    successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerState>>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            inner: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                opened_at: None,
            })),
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Whether a call may go through right now. Moves Open to HalfOpen once
    /// the open timeout has elapsed.
    async fn allow(&self) -> bool {
        let mut guard = self.inner.lock().await;
        match guard.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = guard
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.config.open_timeout);
                if elapsed {
                    tracing::info!(service = self.name, "Circuit breaker half-open");
                    guard.state = CircuitState::HalfOpen;
                    guard.successes = 0;
                }
                elapsed
            }
        }
    }

    async fn on_success(&self) {
        let mut guard = self.inner.lock().await;
        match guard.state {
            CircuitState::HalfOpen => {
                guard.successes += 1;
                if guard.successes >= self.config.success_threshold {
                    tracing::info!(service = self.name, "Circuit breaker closed");
                    guard.state = CircuitState::Closed;
                    guard.failures = 0;
                    guard.opened_at = None;
                }
            }
            CircuitState::Closed => guard.failures = 0,
            CircuitState::Open => {}
        }
    }

    async fn on_failure(&self) {
        let mut guard = self.inner.lock().await;
        guard.failures += 1;
        let trip = match guard.state {
            CircuitState::Closed => guard.failures >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };
        if trip {
            tracing::warn!(service = self.name, failures = guard.failures, "Circuit breaker opened");
            guard.state = CircuitState::Open;
            guard.opened_at = Some(Instant::now());
            guard.successes = 0;
        }
    }
}

/// Effect client decorated with retry and circuit breaking
pub struct Resilient<S> {
    inner: S,
    service: &'static str,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    attempt_timeout: Option<Duration>,
}

impl<S> Resilient<S> {
    pub fn new(service: &'static str, inner: S) -> Self {
        Self::with_policies(service, inner, RetryPolicy::default(), CircuitBreakerConfig::default())
    }

    pub fn with_policies(
        service: &'static str,
        inner: S,
        retry: RetryPolicy,
        breaker: CircuitBreakerConfig,
    ) -> Self {
        Self {
            inner,
            service,
            retry,
            breaker: CircuitBreaker::new(service, breaker),
            attempt_timeout: None,
        }
    }

    /// Bound each attempt by `limit`. A timed-out attempt is reported as
    /// `EffectError::TimedOut` and counted by the breaker.
    pub fn with_attempt_timeout(mut self, limit: Duration) -> Self {
        self.attempt_timeout = Some(limit);
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn call<T, F, Fut>(&self, mut operation: F) -> Result<T, EffectError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EffectError>>,
    {
        let mut attempt = 0;
        let mut delay = self.retry.initial_delay;

        loop {
            attempt += 1;

            if !self.breaker.allow().await {
                return Err(EffectError::CircuitOpen {
                    service: self.service,
                });
            }

            let result = match self.attempt_timeout {
                Some(limit) => guard(self.service, limit, operation()).await,
                None => operation().await,
            };

            match result {
                Ok(value) => {
                    self.breaker.on_success().await;
                    if attempt > 1 {
                        tracing::info!(service = self.service, attempt, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if error.is_fault() {
                        self.breaker.on_failure().await;
                    }
                    if !error.is_transient() {
                        return Err(error);
                    }

                    if attempt >= self.retry.max_attempts {
                        tracing::error!(
                            service = self.service,
                            attempt,
                            error = %error,
                            "Call failed after all retries"
                        );
                        return Err(error);
                    }

                    tracing::warn!(
                        service = self.service,
                        attempt,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "Transient failure, retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.retry.next_delay(delay);
                }
            }
        }
    }
}

#[async_trait]
impl<S: InventoryService> InventoryService for Resilient<S> {
    async fn is_available(&self, item: &OrderItem) -> Result<bool, EffectError> {
        self.call(|| self.inner.is_available(item)).await
    }
}

#[async_trait]
impl<S: PaymentGateway> PaymentGateway for Resilient<S> {
    async fn charge(&self, order: &Order) -> Result<PaymentReceipt, EffectError> {
        self.call(|| self.inner.charge(order)).await
    }
}

#[async_trait]
impl<S: ShippingCarrier> ShippingCarrier for Resilient<S> {
    async fn schedule(&self, order: &Order) -> Result<ShipmentTicket, EffectError> {
        self.call(|| self.inner.schedule(order)).await
    }
}
