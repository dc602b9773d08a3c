//! Retrieval of cluster identity, SyncIQ policies and policy reports.
//!
//! Each function issues exactly one request. A non-2xx status is always an
//! [`FetchError::Upstream`] carrying the status and the raw body.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{Policy, Report, ReportState};
use crate::{
    client::{ApiResponse, ClusterClient},
    error::FetchError,
};

pub const URI_CLUSTER_CONFIG: &str = "cluster/config";
pub const URI_SIQ_POLICIES: &str = "sync/policies";
pub const URI_SIQ_REPORTS: &str = "sync/reports";

/// Report limit used by the collection cycle: only the latest finished report matters.
pub const LATEST_REPORT_LIMIT: u32 = 1;
pub const DEFAULT_REPORT_LIMIT: u32 = 10;

fn check_status(path: &str, response: ApiResponse) -> Result<Value, FetchError> {
    if response.is_success() {
        return Ok(response.body);
    }
    let body = match response.body {
        Value::String(s) => s,
        other => other.to_string(),
    };
    Err(FetchError::Upstream {
        path: path.to_string(),
        status: response.status,
        body,
    })
}

/// Deserializes the array under `key`, treating a missing or `null` key as empty.
fn list_field<T: DeserializeOwned>(path: &str, body: &Value, key: &str) -> Result<Vec<T>, FetchError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(items) => serde_json::from_value(items.clone()).map_err(|e| FetchError::Decode {
            path: path.to_string(),
            reason: format!("{}: {}", key, e),
        }),
    }
}

/// Returns the cluster's current name.
pub async fn fetch_cluster_name(client: &dyn ClusterClient) -> Result<String, FetchError> {
    let response = client.get(URI_CLUSTER_CONFIG, &[]).await?;
    let body = check_status(URI_CLUSTER_CONFIG, response)?;
    body.get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| FetchError::Decode {
            path: URI_CLUSTER_CONFIG.to_string(),
            reason: "missing cluster name".to_string(),
        })
}

/// Returns every SyncIQ policy of the cluster keyed by policy name.
///
/// Should the API return the same name twice, the later entry wins.
pub async fn fetch_policies(
    client: &dyn ClusterClient,
) -> Result<BTreeMap<String, Policy>, FetchError> {
    let response = client.get(URI_SIQ_POLICIES, &[]).await?;
    let body = check_status(URI_SIQ_POLICIES, response)?;
    let policies: Vec<Policy> = list_field(URI_SIQ_POLICIES, &body, "policies")?;
    Ok(policies.into_iter().map(|p| (p.name.clone(), p)).collect())
}

/// Returns up to `limit` recent reports of `policy_name` in `state`.
///
/// The order of the returned reports is whatever the cluster sent.
pub async fn fetch_recent_reports(
    client: &dyn ClusterClient,
    policy_name: &str,
    state: &ReportState,
    limit: u32,
) -> Result<Vec<Report>, FetchError> {
    let query = [
        ("limit", limit.to_string()),
        ("policy_name", policy_name.to_string()),
        ("reports_per_policy", limit.to_string()),
        ("state", state.to_string()),
    ];
    let response = client.get(URI_SIQ_REPORTS, &query).await?;
    let body = check_status(URI_SIQ_REPORTS, response)?;
    list_field(URI_SIQ_REPORTS, &body, "reports")
}
