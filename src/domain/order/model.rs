use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{OrderItem, PaymentMethod, ShippingAddress};

// ============================================================================
// Order - immutable input to the processing pipeline
// ============================================================================

/// An order as received from a client.
///
/// Construction never fails: an empty item list or a non-positive total is
/// representable here and rejected later by the validation stage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
}

impl Order {
    pub fn new(
        customer_id: impl Into<String>,
        items: Vec<OrderItem>,
        total_amount: Decimal,
        payment_method: PaymentMethod,
        shipping_address: ShippingAddress,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id: customer_id.into(),
            items,
            total_amount,
            payment_method,
            shipping_address,
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of all line totals, `None` on overflow. Informational only; the
    /// declared `total_amount` is what gets validated and charged.
    pub fn items_total(&self) -> Option<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |sum, item| {
            sum.checked_add(item.line_total()?)
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_new_order_gets_unique_id() {
        let a = valid_order();
        let b = valid_order();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_empty_order_is_constructible() {
        let order = order_with(vec![], Decimal::ZERO);
        assert_eq!(order.item_count(), 0);
        assert_eq!(order.items_total(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_items_total_preserves_order_and_sums() {
        let order = order_with(
            vec![
                OrderItem::new("a", 2, Decimal::from(5)),
                OrderItem::new("b", 1, Decimal::new(250, 2)),
            ],
            Decimal::new(1250, 2),
        );

        assert_eq!(order.items[0].product_id, "a");
        assert_eq!(order.items[1].product_id, "b");
        assert_eq!(order.items_total(), Some(Decimal::new(1250, 2)));
    }

    #[test]
    fn test_order_serialization() {
        let order = valid_order();
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}
