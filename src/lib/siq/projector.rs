//! Projection of recovery points onto the exported metric schema.
//!
//! Every record yields exactly four gauges sharing one label set:
//!
//! | metric | value |
//! |--------|-------|
//! | `isilon_siq_recovery_point_bytes` | bytes transferred by the run |
//! | `isilon_siq_recovery_point_job_id` | job id of the run |
//! | `isilon_siq_recovery_point_sync_duration_seconds` | `end_time - start_time` |
//! | `isilon_siq_recovery_point_timestamp_milliseconds` | `start_time * 1000` |

use serde_json::Value;

use super::types::RecoveryPointRecord;

pub const BASE_NAME: &str = "isilon";
pub const STAT_NAME: &str = "siq_recovery_point";
pub const SEC_TO_MILLISEC: f64 = 1000.0;

pub const LABEL_NAMES: [&str; 5] = [
    "cluster_name",
    "policy",
    "source_path",
    "target_cluster",
    "target_path",
];

/// The four per-policy statistics, in exposition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPointStat {
    Bytes,
    JobId,
    SyncDurationSeconds,
    TimestampMilliseconds,
}

impl RecoveryPointStat {
    pub const ALL: [RecoveryPointStat; 4] = [
        RecoveryPointStat::Bytes,
        RecoveryPointStat::JobId,
        RecoveryPointStat::SyncDurationSeconds,
        RecoveryPointStat::TimestampMilliseconds,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            RecoveryPointStat::Bytes => "bytes",
            RecoveryPointStat::JobId => "job_id",
            RecoveryPointStat::SyncDurationSeconds => "sync_duration_seconds",
            RecoveryPointStat::TimestampMilliseconds => "timestamp_milliseconds",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            RecoveryPointStat::Bytes => "Bytes transferred in the last successful SyncIQ run",
            RecoveryPointStat::JobId => "SyncIQ job ID for this replication",
            RecoveryPointStat::SyncDurationSeconds => {
                "Time in seconds the SyncIQ policy took to run to completion"
            }
            RecoveryPointStat::TimestampMilliseconds => "Recovery point for the SyncIQ policy",
        }
    }

    /// Full metric name, e.g. `isilon_siq_recovery_point_bytes`.
    pub fn metric_name(self) -> String {
        format!("{}_{}_{}", BASE_NAME, STAT_NAME, self.suffix())
    }

    fn value(self, record: &RecoveryPointRecord) -> f64 {
        let report = &record.report;
        match self {
            RecoveryPointStat::Bytes => to_number(report.bytes_transferred),
            RecoveryPointStat::JobId => to_number(report.job_id),
            RecoveryPointStat::SyncDurationSeconds => to_number(report.duration_secs()),
            RecoveryPointStat::TimestampMilliseconds => {
                to_number(report.start_time) * SEC_TO_MILLISEC
            }
        }
    }
}

/// One labelled sample ready for exposition.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub stat: RecoveryPointStat,
    pub label_values: [String; 5],
    pub value: f64,
}

impl Metric {
    pub fn name(&self) -> String {
        self.stat.metric_name()
    }

    pub fn help(&self) -> &'static str {
        self.stat.help()
    }

    pub fn label_names(&self) -> &'static [&'static str; 5] {
        &LABEL_NAMES
    }

    /// Value of the label `name`, if it is part of the schema.
    pub fn label(&self, name: &str) -> Option<&str> {
        LABEL_NAMES
            .iter()
            .position(|l| *l == name)
            .map(|i| self.label_values[i].as_str())
    }
}

/// Coerces a loosely typed value to a metric value.
///
/// Anything falsy (`null`, `0`, `""`, `false`) becomes `0`; numbers, booleans and numeric
/// strings become their float value, so a zero and a missing value look the same.
/// Values that cannot be read as a finite number also become `0`; no sample is ever NaN.
pub fn to_number(value: impl Into<Value>) -> f64 {
    let n = match value.into() {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(b)),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Array(_) | Value::Object(_) => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn label_values(record: &RecoveryPointRecord) -> [String; 5] {
    [
        record.cluster_name.clone(),
        record.policy.name.clone(),
        record.policy.source_root_path.clone(),
        record.policy.target_host.clone(),
        record.policy.target_path.clone(),
    ]
}

/// Projects one record onto its four metrics.
pub fn project(record: &RecoveryPointRecord) -> [Metric; 4] {
    let labels = label_values(record);
    RecoveryPointStat::ALL.map(|stat| Metric {
        stat,
        label_values: labels.clone(),
        value: stat.value(record),
    })
}

/// Projects every record, keeping record order.
pub fn project_all(records: &[RecoveryPointRecord]) -> Vec<Metric> {
    records.iter().flat_map(project).collect()
}
