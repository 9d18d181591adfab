//! Placement Agent - balanced resource placement service
//!
//! Polls cluster telemetry, keeps per-node statistics up to date and
//! answers placement requests over HTTP.

use anyhow::Result;
use placement_lib::{
    collector::CollectionLoopBuilder,
    health::{components, HealthRegistry},
    observability::{PlacementMetrics, StructuredLogger},
    PlacementDirector,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod telemetry;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting placement-agent");

    // Load configuration; invalid weights stop the agent here
    let config = config::AgentConfig::load()?;
    let options = config.placement_options()?;
    info!(
        instance = %config.instance_name,
        telemetry_endpoint = %config.telemetry_endpoint,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::COLLECTOR).await;
    health_registry.register(components::TELEMETRY_SOURCE).await;

    let metrics = PlacementMetrics::new();

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(
        AGENT_VERSION,
        options.adaptive_filtering,
        options.collection_period.as_secs(),
    );

    let director = Arc::new(PlacementDirector::new(options.clone())?);
    let source = Arc::new(telemetry::HttpTelemetrySource::new(&config.telemetry_endpoint)?);

    let collection_loop = CollectionLoopBuilder::new()
        .source(source)
        .listener(director.clone())
        .options(&options)
        .health(health_registry.clone())
        .build()?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let collector_health = health_registry.clone();
    let collector_handle = tokio::spawn(async move {
        collection_loop.run(shutdown_rx).await;
        collector_health
            .set_unhealthy(components::COLLECTOR, "collection loop stopped")
            .await;
    });

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        director,
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    health_registry.set_ready(false).await;
    // the loop may already have exited, leaving no receivers
    let _ = shutdown_tx.send(());
    if let Err(e) = collector_handle.await {
        error!(error = %e, "Collection loop task panicked");
    }

    info!("Shutting down");

    Ok(())
}
