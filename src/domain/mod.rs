// ============================================================================
// Domain Layer - Order Data
// ============================================================================
//
// Immutable value types that flow through the processing pipeline.
// Nothing in here validates business rules; that is the job of the
// pipeline stages.
//
// ============================================================================

pub mod order;
