use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::order::Order;
use crate::effects::{guard, PaymentGateway};
use crate::pipeline::{Next, OrderHandler, StageOutcome};

/// Charges the order total through the payment gateway.
pub struct PaymentProcessingHandler {
    gateway: Arc<dyn PaymentGateway>,
    timeout: Duration,
}

impl PaymentProcessingHandler {
    pub const NAME: &'static str = "payment";

    pub fn new(gateway: Arc<dyn PaymentGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }
}

#[async_trait]
impl OrderHandler for PaymentProcessingHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(&self, order: &Order, next: Next<'_>) -> StageOutcome {
        match guard(Self::NAME, self.timeout, self.gateway.charge(order)).await {
            Ok(receipt) => {
                tracing::info!(
                    order_id = %order.id,
                    transaction_id = %receipt.transaction_id,
                    amount = %receipt.amount,
                    method = order.payment_method.as_str(),
                    "Payment captured"
                );
                // No refund is issued if a later stage fails.
                next.run(order).await
            }
            Err(error) => StageOutcome::failure(error.stage_reason(Self::NAME)),
        }
    }
}
