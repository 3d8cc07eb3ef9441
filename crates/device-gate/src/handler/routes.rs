//! Route assembly for the gate
//!
//! - GET /health - catalog summary and liveness
//! - GET /metrics - Prometheus text exposition
//! - everything else - the protected downstream (usually the upstream
//!   forwarder) behind [`gate_middleware`]

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;

use super::{gate_middleware, GateState, HealthResponse, HealthStatus};
use crate::GATE_VERSION;

/// Put `router` behind the gate
pub fn protect(router: Router, state: GateState) -> Router {
    router.layer(middleware::from_fn_with_state(state, gate_middleware))
}

/// Full application router: operational endpoints plus the gated
/// downstream
pub fn create_router(state: GateState, downstream: Router) -> Router {
    let ops = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state.clone());

    ops.merge(protect(downstream, state))
        .layer(TraceLayer::new_for_http())
}

/// GET /health
pub async fn health_check(State(state): State<GateState>) -> Json<HealthResponse> {
    let catalog = state.catalog();
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        rule_sets: catalog.len(),
        catalog_digest: catalog.digest().to_string(),
        version: GATE_VERSION.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /metrics
pub async fn metrics_endpoint(State(state): State<GateState>) -> Response {
    let metrics = state.metrics();
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, metrics.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
