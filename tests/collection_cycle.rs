// Collection cycle tests against scripted cluster APIs.
//
// Each `ScriptedCluster` answers the three platform API resources from canned JSON; the
// report resource answers per policy name. Failures are injected per resource to check
// that one cluster never affects the metrics of another.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::{json, Value};
use siq_stats_exporter::{
    client::{ApiResponse, ClusterClient},
    error::FetchError,
    siq::{Metric, RecoveryPointStat, SiqCollector},
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fault {
    None,
    Status(u16, &'static str),
    Transport(&'static str),
    /// 200 with a body of the wrong shape for every resource.
    Body(&'static str),
}

struct ScriptedCluster {
    endpoint: String,
    name: String,
    policies: Vec<Value>,
    reports: HashMap<String, Vec<Value>>,
    fault: Fault,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl ScriptedCluster {
    fn new(name: &str) -> Self {
        Self {
            endpoint: format!("{}.example:8080", name),
            name: name.to_string(),
            policies: Vec::new(),
            reports: HashMap::new(),
            fault: Fault::None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn policy(mut self, name: &str, reports: Vec<Value>) -> Self {
        self.policies.push(json!({
            "name": name,
            "source_root_path": format!("/ifs/data/{}", name),
            "target_host": "isilon-dr",
            "target_path": format!("/ifs/dr/{}", name),
        }));
        self.reports.insert(name.to_string(), reports);
        self
    }

    fn failing(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }
}

#[async_trait]
impl ClusterClient for ScriptedCluster {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse, FetchError> {
        self.requests.lock().unwrap().push((
            path.to_string(),
            query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ));

        match self.fault {
            Fault::Status(status, failing_path) if failing_path == path => {
                return Ok(ApiResponse::new(
                    status,
                    json!({"errors": [{"code": "AEC_EXCEPTION", "message": "boom"}]}),
                ))
            }
            Fault::Transport(failing_path) if failing_path == path => {
                return Err(FetchError::Transport("connection refused".into()))
            }
            Fault::Body(failing_path) if failing_path == path => {
                return Ok(ApiResponse::new(
                    200,
                    json!({"cluster": "renamed", "policies": {"P1": {}}, "reports": "none"}),
                ))
            }
            _ => {}
        }

        let body = match path {
            "cluster/config" => json!({"name": self.name}),
            "sync/policies" => json!({"policies": self.policies}),
            "sync/reports" => {
                let policy = query
                    .iter()
                    .find(|(k, _)| *k == "policy_name")
                    .map(|(_, v)| v.as_str())
                    .unwrap_or_default();
                json!({"reports": self.reports.get(policy).cloned().unwrap_or_default()})
            }
            _ => return Ok(ApiResponse::new(404, Value::Null)),
        };
        Ok(ApiResponse::new(200, body))
    }
}

fn finished(start: i64, end: i64, bytes: u64, job_id: u64) -> Value {
    json!({
        "state": "finished",
        "start_time": start,
        "end_time": end,
        "bytes_transferred": bytes,
        "job_id": job_id,
    })
}

fn value_of(metrics: &[Metric], cluster: &str, policy: &str, stat: RecoveryPointStat) -> Option<f64> {
    metrics
        .iter()
        .find(|m| {
            m.stat == stat
                && m.label("cluster_name") == Some(cluster)
                && m.label("policy") == Some(policy)
        })
        .map(|m| m.value)
}

fn count_for_cluster(metrics: &[Metric], cluster: &str) -> usize {
    metrics
        .iter()
        .filter(|m| m.label("cluster_name") == Some(cluster))
        .count()
}

#[tokio::test]
async fn healthy_cluster_survives_policy_listing_failure_of_another() {
    let a = ScriptedCluster::new("A").policy("P1", vec![finished(1000, 1100, 2048, 7)]);
    let b = ScriptedCluster::new("B")
        .policy("P9", vec![finished(10, 20, 1, 1)])
        .failing(Fault::Status(500, "sync/policies"));
    let collector = SiqCollector::new(vec![Arc::new(a), Arc::new(b)]);

    let metrics = collector.run_cycle().await;

    assert_eq!(metrics.len(), 4);
    assert_eq!(count_for_cluster(&metrics, "B"), 0);
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::SyncDurationSeconds),
        Some(100.0)
    );
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::TimestampMilliseconds),
        Some(1_000_000.0)
    );
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::Bytes),
        Some(2048.0)
    );
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::JobId),
        Some(7.0)
    );

    let m = &metrics[0];
    assert_eq!(m.label("source_path"), Some("/ifs/data/P1"));
    assert_eq!(m.label("target_cluster"), Some("isilon-dr"));
    assert_eq!(m.label("target_path"), Some("/ifs/dr/P1"));
}

#[tokio::test]
async fn failure_on_any_resource_drops_only_that_cluster() {
    let faults = [
        Fault::Status(401, "cluster/config"),
        Fault::Status(503, "sync/policies"),
        Fault::Status(500, "sync/reports"),
        Fault::Transport("cluster/config"),
        Fault::Transport("sync/reports"),
        Fault::Body("cluster/config"),
        Fault::Body("sync/policies"),
        Fault::Body("sync/reports"),
    ];
    for fault in faults {
        let healthy = ScriptedCluster::new("A")
            .policy("P1", vec![finished(1000, 1100, 2048, 7)])
            .policy("P2", vec![finished(2000, 2300, 4096, 8)]);
        let broken = ScriptedCluster::new("B")
            .policy("P1", vec![finished(1, 2, 3, 4)])
            .failing(fault);
        let collector = SiqCollector::new(vec![Arc::new(broken), Arc::new(healthy)]);

        let metrics = collector.run_cycle().await;
        assert_eq!(count_for_cluster(&metrics, "B"), 0);
        assert_eq!(count_for_cluster(&metrics, "A"), 8);
        assert_eq!(
            value_of(&metrics, "A", "P2", RecoveryPointStat::SyncDurationSeconds),
            Some(300.0)
        );
    }
}

#[tokio::test]
async fn latest_finished_report_is_selected() {
    let cluster = ScriptedCluster::new("A").policy(
        "P1",
        vec![finished(450, 500, 111, 1), finished(540, 600, 222, 2)],
    );
    let collector = SiqCollector::new(vec![Arc::new(cluster)]);

    let metrics = collector.run_cycle().await;
    assert_eq!(metrics.len(), 4);
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::Bytes),
        Some(222.0)
    );
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::JobId),
        Some(2.0)
    );
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::SyncDurationSeconds),
        Some(60.0)
    );
}

#[tokio::test]
async fn policy_with_only_running_reports_is_absent() {
    let cluster = ScriptedCluster::new("A")
        .policy(
            "P1",
            vec![json!({"state": "running", "start_time": 900, "end_time": null, "job_id": 3})],
        )
        .policy("P2", vec![finished(1000, 1010, 5, 4)])
        .policy("P3", vec![]);
    let collector = SiqCollector::new(vec![Arc::new(cluster)]);

    let metrics = collector.run_cycle().await;
    assert_eq!(metrics.len(), 4);
    assert!(metrics.iter().all(|m| m.label("policy") == Some("P2")));
}

#[tokio::test]
async fn reports_are_requested_per_policy_with_latest_limit() {
    let cluster = Arc::new(
        ScriptedCluster::new("A")
            .policy("P1", vec![finished(1, 2, 3, 4)])
            .policy("P2", vec![finished(1, 2, 3, 4)]),
    );
    let collector = SiqCollector::new(vec![cluster.clone()]);
    collector.run_cycle().await;

    let requests = cluster.requests.lock().unwrap();
    let report_queries: Vec<_> = requests
        .iter()
        .filter(|(path, _)| path == "sync/reports")
        .map(|(_, q)| q.clone())
        .collect();
    assert_eq!(report_queries.len(), 2);
    for query in &report_queries {
        assert!(query.contains(&("limit".to_string(), "1".to_string())));
        assert!(query.contains(&("state".to_string(), "finished".to_string())));
    }
    assert_eq!(
        requests
            .iter()
            .filter(|(path, _)| path == "cluster/config")
            .count(),
        1
    );
}

#[tokio::test]
async fn every_scrape_fetches_fresh_data() {
    let cluster = Arc::new(ScriptedCluster::new("A").policy("P1", vec![finished(1, 2, 3, 4)]));
    let collector = SiqCollector::new(vec![cluster.clone()]);

    let first = collector.run_cycle().await;
    let second = collector.run_cycle().await;
    assert_eq!(first, second);

    let config_calls = cluster
        .requests
        .lock()
        .unwrap()
        .iter()
        .filter(|(path, _)| path == "cluster/config")
        .count();
    assert_eq!(config_calls, 2);
}

#[tokio::test]
async fn overflowing_report_times_leave_other_clusters_intact() {
    let extreme = ScriptedCluster::new("A").policy(
        "P1",
        vec![json!({"state": "finished", "start_time": i64::MIN, "end_time": 1,
            "bytes_transferred": 10, "job_id": 3})],
    );
    let healthy = ScriptedCluster::new("B").policy("P1", vec![finished(1000, 1100, 2048, 7)]);
    let collector = SiqCollector::new(vec![Arc::new(extreme), Arc::new(healthy)]);

    let metrics = collector.run_cycle().await;
    assert_eq!(metrics.len(), 8);
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::SyncDurationSeconds),
        Some(0.0)
    );
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::JobId),
        Some(3.0)
    );
    assert_eq!(
        value_of(&metrics, "B", "P1", RecoveryPointStat::SyncDurationSeconds),
        Some(100.0)
    );
}

#[tokio::test]
async fn numeric_strings_in_reports_are_coerced() {
    let cluster = ScriptedCluster::new("A").policy(
        "P1",
        vec![json!({"state": "finished", "start_time": "1000", "end_time": 1100.0,
            "bytes_transferred": "2048", "job_id": "7"})],
    );
    let collector = SiqCollector::new(vec![Arc::new(cluster)]);

    let metrics = collector.run_cycle().await;
    assert_eq!(metrics.len(), 4);
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::Bytes),
        Some(2048.0)
    );
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::SyncDurationSeconds),
        Some(100.0)
    );
    assert_eq!(
        value_of(&metrics, "A", "P1", RecoveryPointStat::TimestampMilliseconds),
        Some(1_000_000.0)
    );
}
