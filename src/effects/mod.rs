// ============================================================================
// External Effects - services the pipeline stages suspend on
// ============================================================================
//
// Each stage that talks to the outside world does so through one of these
// traits. Retry and circuit breaking live here, in the clients, never in
// the pipeline itself.
//
// ============================================================================

mod in_memory;
mod resilience;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::order::{Order, OrderItem};

pub use in_memory::{InMemoryInventory, SimulatedCarrier, SimulatedPaymentGateway};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState, Resilient, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EffectError {
    /// The service answered and said no. Displayed verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("{service} unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },

    #[error("{service} timed out after {timeout_ms}ms")]
    TimedOut {
        service: &'static str,
        timeout_ms: u64,
    },

    #[error("{service} circuit breaker is open")]
    CircuitOpen { service: &'static str },
}

impl EffectError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        EffectError::Rejected(reason.into())
    }

    /// Worth retrying: the service may answer differently next time
    pub fn is_transient(&self) -> bool {
        matches!(self, EffectError::Unavailable { .. })
    }

    /// Counts against the circuit breaker. Rejections are answers, so only
    /// an unreachable or silent service does.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            EffectError::Unavailable { .. } | EffectError::TimedOut { .. }
        )
    }

    /// Failure reason for the stage that made the call. Services are free to
    /// reject with an empty message; those fall back to "{stage} failed".
    pub fn stage_reason(&self, stage: &str) -> String {
        let reason = self.to_string();
        if reason.trim().is_empty() {
            format!("{} failed", stage)
        } else {
            reason
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentReceipt {
    pub transaction_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentTicket {
    pub tracking_number: String,
    pub carrier: String,
}

#[async_trait]
pub trait InventoryService: Send + Sync {
    async fn is_available(&self, item: &OrderItem) -> Result<bool, EffectError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, order: &Order) -> Result<PaymentReceipt, EffectError>;
}

#[async_trait]
pub trait ShippingCarrier: Send + Sync {
    async fn schedule(&self, order: &Order) -> Result<ShipmentTicket, EffectError>;
}

/// Bound an effect call by `limit`. An elapsed call becomes
/// `EffectError::TimedOut` so the stage can report it as a failure.
pub async fn guard<T, F>(service: &'static str, limit: Duration, call: F) -> Result<T, EffectError>
where
    F: Future<Output = Result<T, EffectError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(service, timeout_ms = limit.as_millis() as u64, "External call timed out");
            Err(EffectError::TimedOut {
                service,
                timeout_ms: limit.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_displays_reason_verbatim() {
        let err = EffectError::rejected("Card expired");
        assert_eq!(err.to_string(), "Card expired");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        let unavailable = EffectError::Unavailable {
            service: "payment",
            reason: "connection reset".to_string(),
        };
        assert!(unavailable.is_transient());
        assert_eq!(unavailable.to_string(), "payment unavailable: connection reset");

        assert!(!EffectError::TimedOut { service: "payment", timeout_ms: 5 }.is_transient());
        assert!(!EffectError::CircuitOpen { service: "payment" }.is_transient());
    }

    #[test]
    fn test_blank_rejection_falls_back_to_stage_name() {
        assert_eq!(EffectError::rejected("").stage_reason("payment"), "payment failed");
        assert_eq!(EffectError::rejected("  ").stage_reason("shipping"), "shipping failed");
        assert_eq!(
            EffectError::rejected("Card expired").stage_reason("payment"),
            "Card expired"
        );
    }

    #[test]
    fn test_timeouts_count_as_faults() {
        assert!(EffectError::TimedOut { service: "payment", timeout_ms: 5 }.is_fault());
        assert!(!EffectError::rejected("no").is_fault());
        assert!(!EffectError::CircuitOpen { service: "payment" }.is_fault());
    }

    #[tokio::test]
    async fn test_guard_passes_through_result() {
        let result = guard("inventory", Duration::from_secs(1), async { Ok::<_, EffectError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_times_out_slow_call() {
        let result = guard("shipping", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, EffectError>(())
        })
        .await;

        assert_eq!(
            result,
            Err(EffectError::TimedOut {
                service: "shipping",
                timeout_ms: 50
            })
        );
        assert_eq!(result.unwrap_err().to_string(), "shipping timed out after 50ms");
    }
}
