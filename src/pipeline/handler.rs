use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::order::Order;
use crate::metrics::PipelineMetrics;

use super::cancellation::CancellationSignal;
use super::outcome::StageOutcome;

// ============================================================================
// Handler Abstraction
// ============================================================================
//
// A stage sees the order and a `Next` link to the rest of the chain. On its
// own success it returns `next.run(order).await` untouched; on failure it
// returns the failure and never touches `next`.
//
// Handlers are shared by every in-flight request, so they must not keep
// per-request state.
//
// ============================================================================

#[async_trait]
pub trait OrderHandler: Send + Sync {
    /// Stage name used in logs, metrics and failure attribution
    fn name(&self) -> &str;

    async fn process(&self, order: &Order, next: Next<'_>) -> StageOutcome;
}

/// Non-owning link to the handlers after the current one.
///
/// Consumed by `run`, so a stage can forward at most once.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn OrderHandler>],
    cancellation: &'a CancellationSignal,
    metrics: Option<&'a PipelineMetrics>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        remaining: &'a [Arc<dyn OrderHandler>],
        cancellation: &'a CancellationSignal,
        metrics: Option<&'a PipelineMetrics>,
    ) -> Self {
        Self {
            remaining,
            cancellation,
            metrics,
        }
    }

    /// True when there is no downstream stage
    pub fn is_end(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Run the rest of the chain. An empty link is a success.
    pub async fn run(self, order: &Order) -> StageOutcome {
        let Some((head, rest)) = self.remaining.split_first() else {
            return StageOutcome::success();
        };
        let stage = head.name();

        if self.cancellation.is_cancelled() {
            tracing::warn!(
                order_id = %order.id,
                stage,
                "Order processing cancelled"
            );
            if let Some(metrics) = self.metrics {
                metrics.record_cancellation();
            }
            return StageOutcome::failure(format!(
                "Order processing cancelled before stage {}",
                stage
            ))
            .attributed_to(stage);
        }

        if let Some(metrics) = self.metrics {
            metrics.record_stage_invocation(stage);
        }
        tracing::debug!(order_id = %order.id, stage, "Entering stage");

        let downstream = Next {
            remaining: rest,
            ..self
        };
        let outcome = head.process(order, downstream).await.attributed_to(stage);

        if outcome.failed_stage() == Some(stage) {
            if let Some(metrics) = self.metrics {
                metrics.record_stage_failure(stage);
            }
            tracing::info!(
                order_id = %order.id,
                stage,
                reason = outcome.reason().unwrap_or_default(),
                "Stage rejected order"
            );
        }

        outcome
    }
}
