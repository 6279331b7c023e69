// ============================================================================
// Order Domain - Values processed by the pipeline
// ============================================================================
//
// - Value objects (OrderItem, PaymentMethod, ShippingAddress)
// - The Order itself, created once per request and never mutated
//
// ============================================================================

pub mod value_objects;
pub mod model;

// Re-export for convenience
pub use value_objects::*;
pub use model::*;
