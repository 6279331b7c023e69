// ============================================================================
// Order Pipeline - Chain of Responsibility order processing
// ============================================================================
//
// - domain/   - Immutable order values
// - pipeline/ - Handler trait, chain builder/executor, stage registry
// - stages/   - Validation, inventory, payment and shipping handlers
// - effects/  - External services the stages call, plus resilience
// - api/      - actix-web transport
// - metrics/  - Prometheus instrumentation
// - config/   - Command line / environment configuration
//
// ============================================================================

pub mod api;
pub mod config;
pub mod domain;
pub mod effects;
pub mod metrics;
pub mod pipeline;
pub mod stages;
