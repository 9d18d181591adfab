//! HTTP API for placement requests, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use placement_lib::{
    health::{ComponentStatus, HealthRegistry},
    NodeId, PlacementDirector, PlacementError, PlacementMetrics,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: PlacementMetrics,
    pub director: Arc<PlacementDirector>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: PlacementMetrics,
        director: Arc<PlacementDirector>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            director,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlacementRequest {
    pub candidates: Vec<NodeId>,
    /// Node pinned by the caller; used when it is one of the candidates
    #[serde(default)]
    pub hint: Option<NodeId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlacementResponse {
    pub node: NodeId,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        // placement keeps serving from the last known statistics
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Statistics currently used for placement decisions
async fn list_nodes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.director.statistics())
}

/// Choose a node for a new unit of work
async fn place(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlacementRequest>,
) -> Response {
    let result = state
        .director
        .select_node_with_hint(&request.candidates, request.hint.as_ref());

    match result {
        Ok(node) => (StatusCode::OK, Json(PlacementResponse { node })).into_response(),
        Err(e @ PlacementError::NoEligibleNode) => {
            state.metrics.inc_rejected_requests();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Placement failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/v1/nodes", get(list_nodes))
        .route("/v1/placements", post(place))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
