use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_pipeline::api::{start_server, AppState};
use order_pipeline::config::AppConfig;
use order_pipeline::effects::{
    CircuitBreakerConfig, InMemoryInventory, Resilient, RetryPolicy, SimulatedCarrier,
    SimulatedPaymentGateway,
};
use order_pipeline::metrics::PipelineMetrics;
use order_pipeline::pipeline::{build_pipeline, Collaborators};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, override with RUST_LOG
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_pipeline=debug"))
        )
        .init();

    let config = AppConfig::parse();
    config.validate()?;

    tracing::info!("🚀 Starting order pipeline");
    tracing::info!(
        stages = ?config.stages,
        effect_timeout_ms = config.effect_timeout_ms,
        attempt_timeout_ms = config.attempt_timeout_ms,
        "Loaded configuration"
    );

    // === 1. Metrics ===
    let metrics = Arc::new(PipelineMetrics::new()?);

    // === 2. External services (simulated, wrapped with retry + breaker) ===
    let retry = RetryPolicy {
        max_attempts: config.retry_attempts,
        ..RetryPolicy::default()
    };
    let inventory = InMemoryInventory::new()
        .with_stock("SKU-APPLE", 100)
        .with_stock("SKU-BANANA", 250)
        .with_stock("SKU-CHERRY", 5);
    let collaborators = Collaborators {
        inventory: Arc::new(Resilient::with_policies(
            "inventory",
            inventory,
            retry.clone(),
            CircuitBreakerConfig::default(),
        )
        .with_attempt_timeout(config.attempt_timeout())),
        payment: Arc::new(Resilient::with_policies(
            "payment",
            SimulatedPaymentGateway::new(config.payment_limit),
            retry.clone(),
            CircuitBreakerConfig::default(),
        )
        .with_attempt_timeout(config.attempt_timeout())),
        shipping: Arc::new(Resilient::with_policies(
            "shipping",
            SimulatedCarrier::new("acme", config.shipping_countries.clone()),
            retry,
            CircuitBreakerConfig::default(),
        )
        .with_attempt_timeout(config.attempt_timeout())),
        effect_timeout: config.effect_timeout(),
    };

    // === 3. Chain, built once and shared by every request ===
    let pipeline = build_pipeline(&config.stages, &collaborators, Some(metrics.clone()))?;
    tracing::info!(stages = ?pipeline.stage_names(), "🔗 Pipeline ready");

    // === 4. HTTP ===
    start_server(
        AppState {
            pipeline: Arc::new(pipeline),
            metrics,
        },
        &config.host,
        config.port,
    )
    .await?;

    tracing::info!("👋 Order pipeline stopped");

    Ok(())
}
