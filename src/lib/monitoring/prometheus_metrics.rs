//! Prometheus registry for the recovery point gauges.
//!
//! A fresh registry is built for every scrape, so label sets of policies or clusters that
//! disappeared are never exposed again.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::siq::{Metric, RecoveryPointStat, LABEL_NAMES};

#[derive(Clone)]
pub struct PrometheusMetrics {
    pub registry: Registry,
    pub siq_recovery_point_bytes: GaugeVec,
    pub siq_recovery_point_job_id: GaugeVec,
    pub siq_recovery_point_sync_duration_seconds: GaugeVec,
    pub siq_recovery_point_timestamp_milliseconds: GaugeVec,
}

fn register_gauge_vec(
    registry: &Registry,
    stat: RecoveryPointStat,
) -> Result<GaugeVec, prometheus::Error> {
    let gauge = GaugeVec::new(Opts::new(stat.metric_name(), stat.help()), &LABEL_NAMES)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        Ok(Self {
            siq_recovery_point_bytes: register_gauge_vec(&registry, RecoveryPointStat::Bytes)?,
            siq_recovery_point_job_id: register_gauge_vec(&registry, RecoveryPointStat::JobId)?,
            siq_recovery_point_sync_duration_seconds: register_gauge_vec(
                &registry,
                RecoveryPointStat::SyncDurationSeconds,
            )?,
            siq_recovery_point_timestamp_milliseconds: register_gauge_vec(
                &registry,
                RecoveryPointStat::TimestampMilliseconds,
            )?,
            registry,
        })
    }

    fn gauge(&self, stat: RecoveryPointStat) -> &GaugeVec {
        match stat {
            RecoveryPointStat::Bytes => &self.siq_recovery_point_bytes,
            RecoveryPointStat::JobId => &self.siq_recovery_point_job_id,
            RecoveryPointStat::SyncDurationSeconds => &self.siq_recovery_point_sync_duration_seconds,
            RecoveryPointStat::TimestampMilliseconds => {
                &self.siq_recovery_point_timestamp_milliseconds
            }
        }
    }

    /// Sets one gauge sample per metric.
    pub fn record(&self, metrics: &[Metric]) {
        for metric in metrics {
            let labels: Vec<&str> = metric.label_values.iter().map(String::as_str).collect();
            self.gauge(metric.stat)
                .with_label_values(&labels)
                .set(metric.value);
        }
    }

    /// Encodes the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("Encoding error: {}", e))?;
        String::from_utf8(buffer).map_err(|e| format!("UTF-8 error: {}", e))
    }
}
