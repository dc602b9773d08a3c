//! SyncIQ recovery point collection.
//!
//! ## Pipeline
//!
//! ```text
//!   ClusterClient ──► fetcher ──► reducer ──► projector ──► Vec<Metric>
//!   (per cluster)     identity    latest       four gauges
//!                     policies    finished     per policy
//!                     reports     report
//! ```
//!
//! [`SiqCollector`] runs the pipeline for every configured cluster on demand.

pub mod collector;
pub mod fetcher;
pub mod projector;
pub mod reducer;
pub mod types;

pub use collector::{collect_cluster, connect, SiqCollector};
pub use projector::{to_number, Metric, RecoveryPointStat, LABEL_NAMES};
pub use reducer::select_recovery_point;
pub use types::{Policy, RecoveryPointRecord, Report, ReportState};
