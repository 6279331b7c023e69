use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::order::Order;
use crate::effects::{guard, ShippingCarrier};
use crate::pipeline::{Next, OrderHandler, StageOutcome};

/// Books the shipment with the carrier. Normally the last stage.
pub struct ShippingHandler {
    carrier: Arc<dyn ShippingCarrier>,
    timeout: Duration,
}

impl ShippingHandler {
    pub const NAME: &'static str = "shipping";

    pub fn new(carrier: Arc<dyn ShippingCarrier>, timeout: Duration) -> Self {
        Self { carrier, timeout }
    }
}

#[async_trait]
impl OrderHandler for ShippingHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(&self, order: &Order, next: Next<'_>) -> StageOutcome {
        let ticket = match guard(Self::NAME, self.timeout, self.carrier.schedule(order)).await {
            Ok(ticket) => ticket,
            Err(error) => return StageOutcome::failure(error.stage_reason(Self::NAME)),
        };

        tracing::info!(
            order_id = %order.id,
            carrier = %ticket.carrier,
            tracking_number = %ticket.tracking_number,
            "Shipment scheduled"
        );

        next.run(order).await
    }
}
