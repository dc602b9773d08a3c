//! HTTP server exposing recovery point metrics using Axum

use super::prometheus_metrics::PrometheusMetrics;
use crate::siq::{RecoveryPointRecord, SiqCollector};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::{
    future::Future,
    net::SocketAddr,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SyncIQ Stats Exporter API",
        version = "0.1.0",
        description = "Recovery points of SyncIQ replication policies"
    ),
    paths(handle_health, handle_recovery_points),
    components(schemas(HealthResponse, RecoveryPointInfo, RecoveryPointsResponse)),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "synciq", description = "SyncIQ recovery points")
    )
)]
struct ApiDoc;

/// Shared state for all HTTP handlers
#[derive(Clone)]
struct ServerState {
    collector: Arc<SiqCollector>,
}

/// HTTP server that collects from every cluster on each request
pub struct MonitoringServer {
    bind_address: SocketAddr,
    state: ServerState,
}

impl MonitoringServer {
    pub fn new(bind_address: SocketAddr, collector: Arc<SiqCollector>) -> Self {
        Self {
            bind_address,
            state: ServerState { collector },
        }
    }

    /// Routes served by the exporter:
    /// - Prometheus metrics at `/metrics`
    /// - JSON API under `/api/v1`
    /// - OpenAPI spec at `/api-docs/openapi.json`
    pub fn router(&self) -> Router {
        let api_v1 = Router::new()
            .route("/health", get(handle_health))
            .route("/recovery-points", get(handle_recovery_points));

        Router::new()
            .route("/", get(handle_root))
            .route("/api-docs/openapi.json", get(handle_openapi))
            .nest("/api/v1", api_v1)
            .route("/metrics", get(handle_prometheus_metrics))
            .with_state(self.state.clone())
    }

    /// Run the server until the shutdown signal completes
    pub async fn run(
        self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        info!("Starting metrics server on http://{}", self.bind_address);
        info!(
            "Polling {} cluster(s) on every scrape",
            self.state.collector.connections().len()
        );

        let app = self.router();
        let listener = TcpListener::bind(self.bind_address).await?;

        info!(
            "Prometheus metrics available at http://{}/metrics",
            self.bind_address
        );

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal.await;
                info!("Metrics server received shutdown signal, stopping...");
            })
            .await;

        info!("Metrics server stopped");
        result
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
}

#[derive(Serialize, Deserialize, ToSchema)]
struct ErrorResponse {
    error: String,
}

/// Latest completed replication of one policy.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecoveryPointInfo {
    pub cluster_name: String,
    pub policy: String,
    pub source_path: String,
    pub target_cluster: String,
    pub target_path: String,
    /// Start of the run in epoch seconds; the data on the target is consistent to this point.
    pub recovery_point: Option<i64>,
    pub end_time: Option<i64>,
    pub sync_duration_seconds: Option<i64>,
    pub job_id: Option<u64>,
    pub bytes_transferred: Option<u64>,
}

impl From<&RecoveryPointRecord> for RecoveryPointInfo {
    fn from(record: &RecoveryPointRecord) -> Self {
        Self {
            cluster_name: record.cluster_name.clone(),
            policy: record.policy.name.clone(),
            source_path: record.policy.source_root_path.clone(),
            target_cluster: record.policy.target_host.clone(),
            target_path: record.policy.target_path.clone(),
            recovery_point: record.report.start_time,
            end_time: record.report.end_time,
            sync_duration_seconds: record.report.duration_secs(),
            job_id: record.report.job_id,
            bytes_transferred: record.report.bytes_transferred,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RecoveryPointsResponse {
    pub total: usize,
    pub items: Vec<RecoveryPointInfo>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Root endpoint - lists all available APIs
async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "SyncIQ Stats Exporter",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/": "This endpoint - API listing",
            "/api-docs/openapi.json": "OpenAPI specification",
            "/api/v1/health": "Health check",
            "/api/v1/recovery-points": "Current recovery point of every policy",
            "/metrics": "Prometheus metrics"
        }
    }))
}

async fn handle_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: now_secs(),
    })
}

/// Collect from every cluster and return the current recovery points
#[utoipa::path(
    get,
    path = "/api/v1/recovery-points",
    tag = "synciq",
    responses(
        (status = 200, description = "Recovery points of all reachable clusters", body = RecoveryPointsResponse)
    )
)]
async fn handle_recovery_points(State(state): State<ServerState>) -> Json<RecoveryPointsResponse> {
    let records = state.collector.collect_recovery_points().await;
    let items: Vec<RecoveryPointInfo> = records.iter().map(RecoveryPointInfo::from).collect();
    Json(RecoveryPointsResponse {
        total: items.len(),
        items,
    })
}

/// Handler for Prometheus metrics endpoint
async fn handle_prometheus_metrics(State(state): State<ServerState>) -> Response {
    let samples = state.collector.run_cycle().await;

    let metrics = match PrometheusMetrics::new() {
        Ok(metrics) => metrics,
        Err(e) => {
            error!("Unable to create Prometheus registry: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Registry error: {}", e),
                }),
            )
                .into_response();
        }
    };
    metrics.record(&samples);

    match metrics.encode() {
        Ok(metrics_text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            metrics_text,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: e }),
        )
            .into_response(),
    }
}
