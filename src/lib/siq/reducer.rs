//! Reduction of a policy's report history to its recovery point.

use std::collections::BTreeMap;

use super::types::{Policy, RecoveryPointRecord, Report};

/// Picks the report that defines the policy's current recovery point.
///
/// Only finished reports with a non-zero `end_time` are considered. The latest `end_time`
/// wins; among equal end times the highest `job_id` wins, and a report without a job id
/// loses to one with. Input order never matters.
pub fn select_recovery_point(reports: &[Report]) -> Option<&Report> {
    reports
        .iter()
        .filter(|r| r.is_eligible())
        .max_by_key(|r| (r.end_time, r.job_id))
}

/// Builds one record per policy that has an eligible report.
///
/// Policies without one are left out entirely.
pub fn reduce(
    cluster_name: &str,
    policies: &BTreeMap<String, Policy>,
    reports: &BTreeMap<String, Vec<Report>>,
) -> Vec<RecoveryPointRecord> {
    policies
        .iter()
        .filter_map(|(name, policy)| {
            let report = select_recovery_point(reports.get(name)?)?;
            Some(RecoveryPointRecord {
                cluster_name: cluster_name.to_string(),
                policy: policy.clone(),
                report: report.clone(),
            })
        })
        .collect()
}
