use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::order::Order;
use crate::effects::{guard, InventoryService};
use crate::pipeline::{Next, OrderHandler, StageOutcome};

/// Checks stock for every item, in order, stopping at the first shortage.
pub struct InventoryCheckHandler {
    inventory: Arc<dyn InventoryService>,
    timeout: Duration,
}

impl InventoryCheckHandler {
    pub const NAME: &'static str = "inventory";

    pub fn new(inventory: Arc<dyn InventoryService>, timeout: Duration) -> Self {
        Self { inventory, timeout }
    }
}

#[async_trait]
impl OrderHandler for InventoryCheckHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(&self, order: &Order, next: Next<'_>) -> StageOutcome {
        for item in &order.items {
            let available = guard(Self::NAME, self.timeout, self.inventory.is_available(item)).await;

            match available {
                Ok(true) => {
                    tracing::debug!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        "Item in stock"
                    );
                }
                Ok(false) => {
                    return StageOutcome::failure(format!(
                        "Insufficient inventory for product {}",
                        item.product_id
                    ));
                }
                Err(error) => {
                    tracing::warn!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        error = %error,
                        "Inventory lookup failed"
                    );
                    return StageOutcome::failure(error.stage_reason(Self::NAME));
                }
            }
        }

        next.run(order).await
    }
}
