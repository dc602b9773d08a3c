//! Collection cycle across all configured clusters.
//!
//! A cycle fetches, reduces and projects every cluster independently. A cluster that fails
//! at any step contributes nothing to that cycle and is logged; the other clusters are
//! unaffected. Nothing is carried over from one cycle to the next.

use std::{collections::BTreeMap, fmt, sync::Arc, time::Instant};

use futures::future::join_all;
use tracing::{debug, error};

use super::{
    fetcher::{fetch_cluster_name, fetch_policies, fetch_recent_reports, LATEST_REPORT_LIMIT},
    projector::{project_all, Metric},
    reducer::reduce,
    types::{RecoveryPointRecord, ReportState},
};
use crate::{
    client::{ClusterClient, PapiClient},
    config::ClusterEntry,
    error::{FetchError, StartupError},
};

/// Creates one client per cluster entry, in configuration order.
///
/// The password of each entry is moved into its client, leaving the entry without it.
pub fn connect(entries: &mut [ClusterEntry]) -> Result<Vec<Arc<dyn ClusterClient>>, StartupError> {
    let mut connections: Vec<Arc<dyn ClusterClient>> = Vec::with_capacity(entries.len());
    for entry in entries.iter_mut() {
        let password = entry.take_password().unwrap_or_default();
        let client = PapiClient::new(entry.endpoint(), entry.user(), password).map_err(|e| {
            StartupError::Client {
                endpoint: entry.endpoint().to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!("Connected to: {}", entry.endpoint());
        connections.push(Arc::new(client));
    }
    Ok(connections)
}

/// Fetches and reduces the recovery points of a single cluster.
pub async fn collect_cluster(
    client: &dyn ClusterClient,
) -> Result<Vec<RecoveryPointRecord>, FetchError> {
    let cluster_name = fetch_cluster_name(client).await?;
    let policies = fetch_policies(client).await?;

    let mut reports = BTreeMap::new();
    for name in policies.keys() {
        let recent =
            fetch_recent_reports(client, name, &ReportState::Finished, LATEST_REPORT_LIMIT)
                .await?;
        reports.insert(name.clone(), recent);
    }

    Ok(reduce(&cluster_name, &policies, &reports))
}

/// Runs collection cycles over a fixed set of cluster connections.
pub struct SiqCollector {
    connections: Vec<Arc<dyn ClusterClient>>,
}

impl fmt::Debug for SiqCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endpoints: Vec<&str> = self.connections.iter().map(|c| c.endpoint()).collect();
        f.debug_struct("SiqCollector")
            .field("endpoints", &endpoints)
            .finish()
    }
}

impl SiqCollector {
    pub fn new(connections: Vec<Arc<dyn ClusterClient>>) -> Self {
        Self { connections }
    }

    pub fn connections(&self) -> &[Arc<dyn ClusterClient>] {
        &self.connections
    }

    /// Collects the recovery points of every cluster.
    ///
    /// Clusters are queried concurrently; results keep configuration order.
    pub async fn collect_recovery_points(&self) -> Vec<RecoveryPointRecord> {
        let started = Instant::now();
        let results = join_all(self.connections.iter().map(|client| async move {
            (client.endpoint(), collect_cluster(client.as_ref()).await)
        }))
        .await;

        let mut records = Vec::new();
        for (endpoint, result) in results {
            match result {
                Ok(cluster_records) => records.extend(cluster_records),
                Err(e) => error!("Unable to collect SyncIQ stats from {}: {}", endpoint, e),
            }
        }
        debug!(
            "Collected {} recovery points from {} clusters in {:?}",
            records.len(),
            self.connections.len(),
            started.elapsed()
        );
        records
    }

    /// Runs one full cycle and returns the metrics of every healthy cluster.
    pub async fn run_cycle(&self) -> Vec<Metric> {
        project_all(&self.collect_recovery_points().await)
    }
}
