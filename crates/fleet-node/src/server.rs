//! HTTP surface: Prometheus exposition of the fleet and of this process.
//!
//! | Route | Answer |
//! |-------|--------|
//! | `GET /metrics[?timeout_ms=N]` | merged metrics of every online sibling |
//! | `GET /metrics/local` | this process only |
//! | `GET /health` | liveness |

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use fleet_telemetry::{MergedRegistry, MetricsSource, CONTENT_TYPE};
use fm_03_aggregate_metrics::AggregateMetricsService;
use serde::Deserialize;
use shared_types::ClusterError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Optional query parameters of `GET /metrics`.
#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    /// Overrides the configured aggregate timeout.
    pub timeout_ms: Option<u64>,
}

/// Build the metrics router over `service`.
pub fn router<S>(service: Arc<AggregateMetricsService<S>>) -> Router
where
    S: MetricsSource + 'static,
{
    Router::new()
        .route("/metrics", get(aggregate_metrics::<S>))
        .route("/metrics/local", get(local_metrics::<S>))
        .route("/health", get(health_check))
        .with_state(service)
}

/// HTTP status for a failed aggregate.
pub fn status_for(error: &ClusterError) -> StatusCode {
    match error {
        ClusterError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ClusterError::RequestInFlight(_) => StatusCode::CONFLICT,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn aggregate_metrics<S: MetricsSource + 'static>(
    State(service): State<Arc<AggregateMetricsService<S>>>,
    Query(query): Query<MetricsQuery>,
) -> Response {
    let timeout = query.timeout_ms.map(Duration::from_millis);
    exposition(service.get_aggregate_metrics(timeout).await)
}

async fn local_metrics<S: MetricsSource + 'static>(
    State(service): State<Arc<AggregateMetricsService<S>>>,
) -> Response {
    exposition(service.local_registry())
}

fn exposition(result: Result<MergedRegistry, ClusterError>) -> Response {
    let registry = match result {
        Ok(registry) => registry,
        Err(e) => {
            let status = status_for(&e);
            warn!(error = %e, status = status.as_u16(), "Metrics request failed");
            return (status, format!("{e}\n")).into_response();
        }
    };

    match registry.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n")).into_response()
        }
    }
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "fleet-node",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
