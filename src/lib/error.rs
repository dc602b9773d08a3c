//! Error kinds for the exporter.
//!
//! [`FetchError`] covers a single cluster call and only ever drops that cluster from the
//! current collection cycle. [`ConfigError`] covers a single cluster entry and only ever
//! drops that entry. [`StartupError`] is fatal and carries the process exit code.

use std::path::PathBuf;

/// Failure of one request against a cluster management API.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The cluster answered with a non-2xx status.
    #[error("Error in PAPI request to {path}: status {status}, body: {body}")]
    Upstream {
        path: String,
        status: u16,
        body: String,
    },
    /// Connectivity, TLS or timeout failure reported by the HTTP client.
    #[error("Transport error: {0}")]
    Transport(String),
    /// A 2xx response whose body did not have the expected shape.
    #[error("Unexpected response from {path}: {reason}")]
    Decode { path: String, reason: String },
}

/// Problem with a single `cluster` entry of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing key ({field}) in YAML configuration. Partial entry: {entry}")]
    MissingField { field: &'static str, entry: String },
}

/// Errors that terminate the process before the exporter starts serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("A YAML configuration file is a required parameter")]
    MissingConfig,
    #[error("An error occurred loading the configuration file {path}: {reason}")]
    ConfigUnreadable { path: PathBuf, reason: String },
    #[error("The configuration file contains no data")]
    ConfigEmpty,
    #[error("An error occurred parsing the configuration file: {0}")]
    ConfigInvalid(String),
    #[error("No cluster endpoints found in the configuration file")]
    NoEndpoints,
    #[error("Unable to create cluster client for {endpoint}: {reason}")]
    Client { endpoint: String, reason: String },
    #[error("Invalid exporter settings: {0}")]
    Settings(String),
    #[error("Metrics server error: {0}")]
    Server(String),
}

impl StartupError {
    /// Process exit code reported for this error.
    ///
    /// | code | meaning |
    /// |------|---------|
    /// | 1 | missing configuration / invalid arguments |
    /// | 2 | a runtime dependency (HTTP client backend) is unavailable |
    /// | 3 | configuration file unreadable or empty |
    /// | 4 | configuration file content invalid |
    /// | 5 | no cluster endpoints resolved |
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::MissingConfig | StartupError::Settings(_) => 1,
            StartupError::Client { .. } => 2,
            StartupError::ConfigUnreadable { .. } | StartupError::ConfigEmpty => 3,
            StartupError::ConfigInvalid(_) => 4,
            StartupError::NoEndpoints => 5,
            StartupError::Server(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_documented_table() {
        assert_eq!(StartupError::MissingConfig.exit_code(), 1);
        assert_eq!(
            StartupError::Client {
                endpoint: "c1".into(),
                reason: "tls".into()
            }
            .exit_code(),
            2
        );
        assert_eq!(
            StartupError::ConfigUnreadable {
                path: PathBuf::from("/nope.yml"),
                reason: "not found".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(StartupError::ConfigEmpty.exit_code(), 3);
        assert_eq!(StartupError::ConfigInvalid("x".into()).exit_code(), 4);
        assert_eq!(StartupError::NoEndpoints.exit_code(), 5);
    }

    #[test]
    fn upstream_error_carries_status_and_body() {
        let err = FetchError::Upstream {
            path: "sync/policies".into(),
            status: 503,
            body: "{\"errors\":[]}".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sync/policies"));
        assert!(msg.contains("503"));
        assert!(msg.contains("errors"));
    }
}
