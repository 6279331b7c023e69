use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::order::Order;
use crate::pipeline::{Next, OrderHandler, StageOutcome};

pub const EMPTY_ITEMS: &str = "Order must contain at least one item";
pub const NON_POSITIVE_TOTAL: &str = "Order total must be greater than zero";

/// Rejects orders without items or with a total that is not positive.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationHandler;

impl ValidationHandler {
    pub const NAME: &'static str = "validation";
}

#[async_trait]
impl OrderHandler for ValidationHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(&self, order: &Order, next: Next<'_>) -> StageOutcome {
        if order.items.is_empty() {
            return StageOutcome::failure(EMPTY_ITEMS);
        }

        if order.total_amount <= Decimal::ZERO {
            return StageOutcome::failure(NON_POSITIVE_TOTAL);
        }

        // Line sums are only advisory; the declared total is what gets charged
        match order.items_total() {
            Some(sum) if sum == order.total_amount => {}
            Some(sum) => tracing::warn!(
                order_id = %order.id,
                declared = %order.total_amount,
                items_total = %sum,
                "Declared total differs from line items"
            ),
            None => tracing::warn!(order_id = %order.id, "Line item totals overflow"),
        }

        next.run(order).await
    }
}
