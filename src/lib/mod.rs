//! Prometheus exporter for PowerScale SyncIQ replication recovery points.
//!
//! On every scrape the exporter asks each configured cluster for its SyncIQ policies and
//! their latest finished report, and exposes the resulting recovery points as gauges.
use std::{fmt, sync::Arc};

use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use crate::{
    config::{load_cluster_file, ExporterSettings},
    error::StartupError,
    monitoring::MonitoringServer,
    siq::{connect, RecoveryPointRecord, SiqCollector},
};

pub mod args;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitoring;
pub mod siq;

/// Represent the SyncIQ stats exporter
pub struct SiqStatsExporter {
    settings: ExporterSettings,
}

impl SiqStatsExporter {
    /// Creates a new [`SiqStatsExporter`] instance.
    pub fn new(settings: ExporterSettings) -> Self {
        Self { settings }
    }

    /// Loads the cluster file and creates one connection per usable entry.
    pub fn build_collector(&self) -> Result<SiqCollector, StartupError> {
        let path = self.settings.config().ok_or(StartupError::MissingConfig)?;
        let mut entries = load_cluster_file(path)?;
        if entries.is_empty() {
            return Err(StartupError::NoEndpoints);
        }
        let connections = connect(&mut entries)?;
        info!("Monitoring {} cluster(s)", connections.len());
        Ok(SiqCollector::new(connections))
    }

    /// Starts the exporter and serves metrics until SIGINT or SIGTERM.
    ///
    /// With `--once`, runs a single collection cycle, prints it and returns.
    pub async fn start(&self) -> Result<(), StartupError> {
        let collector = Arc::new(self.build_collector()?);

        if self.settings.once() {
            let records = collector.collect_recovery_points().await;
            if records.is_empty() {
                warn!("No recovery points collected");
            }
            print!("{}", format_recovery_points(&records));
            return Ok(());
        }

        MonitoringServer::new(self.settings.listen_address(), collector)
            .run(shutdown_signal())
            .await
            .map_err(|e| StartupError::Server(e.to_string()))
    }
}

/// Completes on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Terminating SyncIQ stats exporter");
}

fn local_time(epoch_secs: i64) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Human readable listing of recovery points, one block per policy.
pub struct RecoveryPointListing<'a>(pub &'a [RecoveryPointRecord]);

impl fmt::Display for RecoveryPointListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in self.0 {
            let policy = &record.policy;
            let report = &record.report;
            writeln!(f, "Source cluster: {}", record.cluster_name)?;
            writeln!(f, "Policy name   : {}", policy.name)?;
            writeln!(f, "Source path   : {}", policy.source_root_path)?;
            writeln!(f, "Target cluster: {}", policy.target_host)?;
            writeln!(f, "Target path   : {}", policy.target_path)?;
            writeln!(
                f,
                "Recovery point: {}",
                report
                    .start_time
                    .map(local_time)
                    .unwrap_or_else(|| "unknown".to_string())
            )?;
            writeln!(
                f,
                "Sync duration : {} seconds",
                or_unknown(report.duration_secs())
            )?;
            writeln!(f, "Last successful job: {}", or_unknown(report.job_id))?;
            writeln!(
                f,
                "Bytes transferred  : {}",
                or_unknown(report.bytes_transferred)
            )?;
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Renders [`RecoveryPointListing`] for `records`.
pub fn format_recovery_points(records: &[RecoveryPointRecord]) -> String {
    RecoveryPointListing(records).to_string()
}
