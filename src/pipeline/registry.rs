use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::effects::{InventoryService, PaymentGateway, ShippingCarrier};
use crate::metrics::PipelineMetrics;
use crate::stages::{
    InventoryCheckHandler, PaymentProcessingHandler, ShippingHandler, ValidationHandler,
};

use super::chain::{Pipeline, PipelineBuilder, PipelineError};
use super::handler::OrderHandler;

// ============================================================================
// Stage Registry
// ============================================================================
//
// The set of stages is declared here, not discovered. Configuration picks
// which of them to chain and in what order.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Validation,
    Inventory,
    Payment,
    Shipping,
}

impl StageKind {
    pub fn default_chain() -> Vec<StageKind> {
        vec![
            StageKind::Validation,
            StageKind::Inventory,
            StageKind::Payment,
            StageKind::Shipping,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Validation => ValidationHandler::NAME,
            StageKind::Inventory => InventoryCheckHandler::NAME,
            StageKind::Payment => PaymentProcessingHandler::NAME,
            StageKind::Shipping => ShippingHandler::NAME,
        }
    }
}

/// External services the effectful stages depend on
#[derive(Clone)]
pub struct Collaborators {
    pub inventory: Arc<dyn InventoryService>,
    pub payment: Arc<dyn PaymentGateway>,
    pub shipping: Arc<dyn ShippingCarrier>,
    /// Upper bound on each individual external call
    pub effect_timeout: Duration,
}

impl Collaborators {
    fn handler_for(&self, kind: StageKind) -> Arc<dyn OrderHandler> {
        match kind {
            StageKind::Validation => Arc::new(ValidationHandler),
            StageKind::Inventory => Arc::new(InventoryCheckHandler::new(
                self.inventory.clone(),
                self.effect_timeout,
            )),
            StageKind::Payment => Arc::new(PaymentProcessingHandler::new(
                self.payment.clone(),
                self.effect_timeout,
            )),
            StageKind::Shipping => Arc::new(ShippingHandler::new(
                self.shipping.clone(),
                self.effect_timeout,
            )),
        }
    }
}

/// Resolve a configured stage list into a runnable pipeline.
pub fn build_pipeline(
    stages: &[StageKind],
    collaborators: &Collaborators,
    metrics: Option<Arc<PipelineMetrics>>,
) -> Result<Pipeline, PipelineError> {
    let builder = stages
        .iter()
        .fold(PipelineBuilder::new(), |builder, kind| {
            builder.stage_shared(collaborators.handler_for(*kind))
        });

    match metrics {
        Some(metrics) => builder.with_metrics(metrics).build(),
        None => builder.build(),
    }
}
