//! SyncIQ resource types as returned by the platform API.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A replication policy. Only the fields used for labelling are kept.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Policy {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source_root_path: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub target_host: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub target_path: String,
}

/// Execution state of a policy report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReportState {
    Finished,
    Running,
    Failed,
    Canceled,
    #[default]
    Unknown,
    Other(String),
}

impl ReportState {
    pub fn as_str(&self) -> &str {
        match self {
            ReportState::Finished => "finished",
            ReportState::Running => "running",
            ReportState::Failed => "failed",
            ReportState::Canceled => "canceled",
            ReportState::Unknown => "unknown",
            ReportState::Other(s) => s,
        }
    }
}

impl From<&str> for ReportState {
    fn from(s: &str) -> Self {
        match s {
            "finished" => ReportState::Finished,
            "running" => ReportState::Running,
            "failed" => ReportState::Failed,
            "canceled" | "cancelled" => ReportState::Canceled,
            "" | "unknown" => ReportState::Unknown,
            other => ReportState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReportState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        Ok(s.as_deref().map(ReportState::from).unwrap_or_default())
    }
}

impl Serialize for ReportState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// One historical run of a policy.
///
/// Every numeric field may be absent or `null` on the wire, and is also accepted as a
/// float or a numeric string. A value that is not a number, or does not fit the field,
/// reads as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub policy_name: Option<String>,
    #[serde(default)]
    pub state: ReportState,
    /// Epoch seconds.
    #[serde(default, deserialize_with = "loose_i64")]
    pub start_time: Option<i64>,
    /// Epoch seconds, only set once the run has ended.
    #[serde(default, deserialize_with = "loose_i64")]
    pub end_time: Option<i64>,
    #[serde(default, deserialize_with = "loose_u64")]
    pub bytes_transferred: Option<u64>,
    #[serde(default, deserialize_with = "loose_u64")]
    pub job_id: Option<u64>,
}

impl Report {
    /// Whether this report may be picked as the recovery point of its policy.
    pub fn is_eligible(&self) -> bool {
        self.state == ReportState::Finished && self.end_time.is_some_and(|t| t != 0)
    }

    /// `end_time - start_time`, when both are known and the difference fits an `i64`.
    pub fn duration_secs(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.checked_sub(start),
            _ => None,
        }
    }
}

/// The most recent completed run of one policy on one cluster, valid for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPointRecord {
    pub cluster_name: String,
    pub policy: Policy,
    pub report: Report,
}

fn integer(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i128)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i128>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f as i128)
            })
        }
        _ => None,
    }
}

fn loose_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(integer)
        .and_then(|n| i64::try_from(n).ok()))
}

fn loose_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(integer)
        .and_then(|n| u64::try_from(n).ok()))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
