// ============================================================================
// Order Processing Pipeline
// ============================================================================
//
// - outcome/      - StageOutcome, the result of every stage and of a run
// - handler/      - OrderHandler trait and the Next link
// - chain/        - PipelineBuilder and the Pipeline executor
// - cancellation/ - Cooperative cancellation checked between stages
// - registry/     - Statically declared stages, resolved from configuration
//
// ============================================================================

mod cancellation;
mod chain;
pub(crate) mod handler;
mod outcome;
mod registry;

pub use cancellation::{cancellation, CancellationHandle, CancellationSignal};
pub use chain::{Pipeline, PipelineBuilder, PipelineError};
pub use handler::{Next, OrderHandler};
pub use outcome::{StageFailure, StageOutcome};
pub use registry::{build_pipeline, Collaborators, StageKind};

#[cfg(test)]
pub(crate) use registry::test_support;
