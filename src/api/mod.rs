// ============================================================================
// HTTP API - transport around the pipeline
// ============================================================================
//
// Deserializes orders, runs them through the pipeline and maps the outcome
// to a status code. Also serves /health and /metrics.
//
// ============================================================================

mod dto;
mod server;

pub use dto::{AddressDto, OrderItemDto, OrderRequest, OrderResponse};
pub use server::{configure, json_config, start_server, AppState};
