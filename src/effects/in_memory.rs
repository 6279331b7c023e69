use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::order::{Order, OrderItem, PaymentMethod};

use super::{
    EffectError, InventoryService, PaymentGateway, PaymentReceipt, ShipmentTicket,
    ShippingCarrier,
};

// ============================================================================
// In-Memory Effect Clients
// ============================================================================
//
// Deterministic stand-ins for the inventory, payment and shipping services.
// The binary wires these in by default; an optional latency makes each call
// a real suspension point.
//
// ============================================================================

async fn simulate_latency(latency: Option<Duration>) {
    if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
    }
}

/// Read-only stock table keyed by product id
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    stock: HashMap<String, u32>,
    latency: Option<Duration>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stock(mut self, product_id: impl Into<String>, quantity: u32) -> Self {
        self.stock.insert(product_id.into(), quantity);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl InventoryService for InMemoryInventory {
    async fn is_available(&self, item: &OrderItem) -> Result<bool, EffectError> {
        simulate_latency(self.latency).await;
        let on_hand = self.stock.get(&item.product_id).copied().unwrap_or(0);
        Ok(on_hand >= item.quantity)
    }
}

/// Approves charges up to a per-method limit
#[derive(Debug, Clone)]
pub struct SimulatedPaymentGateway {
    default_limit: Decimal,
    limits: HashMap<PaymentMethod, Decimal>,
    latency: Option<Duration>,
}

impl SimulatedPaymentGateway {
    pub fn new(default_limit: Decimal) -> Self {
        Self {
            default_limit,
            limits: HashMap::new(),
            latency: None,
        }
    }

    pub fn with_limit(mut self, method: PaymentMethod, limit: Decimal) -> Self {
        self.limits.insert(method, limit);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn limit_for(&self, method: PaymentMethod) -> Decimal {
        self.limits.get(&method).copied().unwrap_or(self.default_limit)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn charge(&self, order: &Order) -> Result<PaymentReceipt, EffectError> {
        simulate_latency(self.latency).await;

        let limit = self.limit_for(order.payment_method);
        if order.total_amount > limit {
            return Err(EffectError::rejected(format!(
                "Payment declined: {} exceeds the {} limit of {}",
                order.total_amount,
                order.payment_method.as_str(),
                limit
            )));
        }

        Ok(PaymentReceipt {
            transaction_id: Uuid::now_v7(),
            amount: order.total_amount,
        })
    }
}

/// Schedules shipments to a fixed set of countries
#[derive(Debug, Clone)]
pub struct SimulatedCarrier {
    carrier: String,
    countries: HashSet<String>,
    latency: Option<Duration>,
}

impl SimulatedCarrier {
    pub fn new<I, C>(carrier: impl Into<String>, countries: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            carrier: carrier.into(),
            countries: countries.into_iter().map(Into::into).collect(),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl ShippingCarrier for SimulatedCarrier {
    async fn schedule(&self, order: &Order) -> Result<ShipmentTicket, EffectError> {
        simulate_latency(self.latency).await;

        let country = &order.shipping_address.country;
        if !self.countries.contains(country) {
            return Err(EffectError::rejected(format!(
                "Shipping unavailable to {}",
                country
            )));
        }

        Ok(ShipmentTicket {
            tracking_number: format!("{}-{}", self.carrier.to_uppercase(), order.id.simple()),
            carrier: self.carrier.clone(),
        })
    }
}
