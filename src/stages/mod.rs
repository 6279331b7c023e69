// ============================================================================
// Pipeline Stages
// ============================================================================
//
// The four order-processing stages, in their usual chain order:
// validation -> inventory -> payment -> shipping
//
// ============================================================================

mod inventory;
mod payment;
mod shipping;
mod validation;

pub use inventory::InventoryCheckHandler;
pub use payment::PaymentProcessingHandler;
pub use shipping::ShippingHandler;
pub use validation::ValidationHandler;
