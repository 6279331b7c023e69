use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{Order, OrderItem, PaymentMethod, ShippingAddress};
use crate::pipeline::StageFailure;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    pub product_id: String,
    /// Zero is refused while decoding, so it never reaches the pipeline
    pub quantity: NonZeroU32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDto {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Body of `POST /orders`. A missing `id` gets a fresh one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub customer_id: String,
    pub items: Vec<OrderItemDto>,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub shipping_address: AddressDto,
}

impl From<OrderItemDto> for OrderItem {
    fn from(dto: OrderItemDto) -> Self {
        OrderItem::new(dto.product_id, dto.quantity.get(), dto.unit_price)
    }
}

impl From<AddressDto> for ShippingAddress {
    fn from(dto: AddressDto) -> Self {
        ShippingAddress {
            street: dto.street,
            city: dto.city,
            state: dto.state,
            postal_code: dto.postal_code,
            country: dto.country,
        }
    }
}

impl From<OrderRequest> for Order {
    fn from(request: OrderRequest) -> Self {
        Order {
            id: request.id.unwrap_or_else(Uuid::new_v4),
            customer_id: request.customer_id,
            items: request.items.into_iter().map(OrderItem::from).collect(),
            total_amount: request.total_amount,
            payment_method: request.payment_method,
            shipping_address: request.shipping_address.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
}

impl OrderResponse {
    pub fn accepted(order_id: Uuid) -> Self {
        Self {
            success: true,
            order_id: Some(order_id),
            error_message: None,
            failed_stage: None,
        }
    }

    pub fn rejected(order_id: Uuid, failure: &StageFailure) -> Self {
        Self {
            success: false,
            order_id: Some(order_id),
            error_message: Some(failure.reason().to_string()),
            failed_stage: failure.stage().map(str::to_string),
        }
    }

    /// Body could not be read as an order; the pipeline never ran
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            order_id: None,
            error_message: Some(message.into()),
            failed_stage: None,
        }
    }

    pub fn internal_error(order_id: Uuid) -> Self {
        Self {
            success: false,
            order_id: Some(order_id),
            error_message: Some("Internal error processing order".to_string()),
            failed_stage: None,
        }
    }
}
