//! Metrics exposition for the exporter.
//!
//! Provides the Prometheus `/metrics` endpoint and a small HTTP JSON API. Every request
//! that needs cluster data triggers a fresh collection cycle; nothing is cached between
//! requests.

pub mod http_server;
pub mod prometheus_metrics;

pub use http_server::{MonitoringServer, RecoveryPointInfo, RecoveryPointsResponse};
pub use prometheus_metrics::PrometheusMetrics;
