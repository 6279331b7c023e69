use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::domain::order::Order;
use crate::metrics::PipelineMetrics;

use super::cancellation::CancellationSignal;
use super::handler::{Next, OrderHandler};
use super::outcome::StageOutcome;

// ============================================================================
// Pipeline - Chain Builder and Executor
// ============================================================================
//
// The builder links handlers in the order they are added. Once built, the
// chain is read-only and can be shared across any number of concurrent runs.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Stage '{stage}' is linked at positions {first} and {repeated}; the chain would revisit it")]
    CyclicChain {
        stage: String,
        first: usize,
        repeated: usize,
    },

    #[error("Stage at position {0} has an empty name")]
    UnnamedStage(usize),
}

#[derive(Default)]
pub struct PipelineBuilder {
    handlers: Vec<Arc<dyn OrderHandler>>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the end of the chain
    pub fn stage<H: OrderHandler + 'static>(self, handler: H) -> Self {
        self.stage_shared(Arc::new(handler))
    }

    /// Append an already shared handler
    pub fn stage_shared(mut self, handler: Arc<dyn OrderHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        for (position, handler) in self.handlers.iter().enumerate() {
            if handler.name().trim().is_empty() {
                return Err(PipelineError::UnnamedStage(position));
            }

            // Linking the same handler, or another instance of the same
            // stage, twice means a traversal would come back to it.
            if let Some(first) = self.handlers[..position].iter().position(|earlier| {
                Arc::ptr_eq(earlier, handler) || earlier.name() == handler.name()
            }) {
                return Err(PipelineError::CyclicChain {
                    stage: handler.name().to_string(),
                    first,
                    repeated: position,
                });
            }
        }

        tracing::debug!(
            stages = ?self.handlers.iter().map(|h| h.name()).collect::<Vec<_>>(),
            "Pipeline built"
        );

        Ok(Pipeline {
            handlers: self.handlers.into(),
            metrics: self.metrics,
        })
    }
}

pub struct Pipeline {
    handlers: Arc<[Arc<dyn OrderHandler>]>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn from_handlers(handlers: Vec<Arc<dyn OrderHandler>>) -> Result<Self, PipelineError> {
        handlers
            .into_iter()
            .fold(PipelineBuilder::new(), PipelineBuilder::stage_shared)
            .build()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    pub async fn run(&self, order: &Order) -> StageOutcome {
        self.run_with_cancellation(order, &CancellationSignal::never())
            .await
    }

    /// Run the chain, checking `cancellation` before each stage
    pub async fn run_with_cancellation(
        &self,
        order: &Order,
        cancellation: &CancellationSignal,
    ) -> StageOutcome {
        let span = tracing::info_span!(
            "pipeline_run",
            order_id = %order.id,
            customer_id = %order.customer_id,
        );

        async {
            let started = Instant::now();
            let metrics = self.metrics.as_deref();

            let outcome = Next::new(&self.handlers, cancellation, metrics)
                .run(order)
                .await;

            if let Some(metrics) = metrics {
                metrics.record_run(outcome.is_success(), started.elapsed().as_secs_f64());
            }

            match &outcome {
                StageOutcome::Success => {
                    tracing::info!(item_count = order.item_count(), "Order processed");
                }
                StageOutcome::Failure(failure) => {
                    tracing::info!(
                        stage = failure.stage().unwrap_or("unknown"),
                        reason = failure.reason(),
                        "Order rejected"
                    );
                }
            }

            outcome
        }
        .instrument(span)
        .await
    }
}
