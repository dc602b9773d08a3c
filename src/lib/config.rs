//! ## Configuration Module
//!
//! Defines [`ExporterSettings`], the runtime settings of the exporter, and [`ClusterEntry`],
//! one monitored cluster as listed in the YAML cluster file.
//!
//! The cluster file has the following layout:
//!
//! ```yaml
//! ---
//! - cluster:
//!     user: "monitor"
//!     password: "secret"
//!     endpoint: "cluster1.example.com:8080"
//! - cluster:
//!     user: "monitor"
//!     password: "secret"
//!     endpoint: "10.0.0.20"
//! ```
//!
//! An entry missing one of `endpoint`, `user` or `password` is logged and skipped; it never
//! prevents the remaining entries from being used.
use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_yaml::Value;
use tracing::error;

use crate::error::{ConfigError, StartupError};

pub const DEFAULT_SERVER_PORT: u16 = 8000;
pub const ENV_PREFIX: &str = "PS_SIQ_STATS";

/// Runtime settings after CLI arguments and environment variables have been layered.
#[derive(Clone, Debug, Deserialize)]
pub struct ExporterSettings {
    #[serde(default)]
    config: Option<PathBuf>,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_bind")]
    bind: IpAddr,
    #[serde(default)]
    debug: u8,
    #[serde(default)]
    log_file: Option<PathBuf>,
    #[serde(default)]
    once: bool,
}

fn default_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

impl Default for ExporterSettings {
    fn default() -> Self {
        Self {
            config: None,
            port: default_port(),
            bind: default_bind(),
            debug: 0,
            log_file: None,
            once: false,
        }
    }
}

impl ExporterSettings {
    /// Returns the path of the YAML cluster file, if one was given.
    pub fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Returns the port the metrics server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the socket address the metrics server binds to.
    pub fn listen_address(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Returns the debug verbosity (number of `--debug` flags).
    pub fn debug(&self) -> u8 {
        self.debug
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Whether to run a single collection cycle and print the result instead of serving.
    pub fn once(&self) -> bool {
        self.once
    }
}

/// Connection details for one monitored cluster.
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterEntry {
    endpoint: String,
    user: String,
    password: Option<String>,
}

// The password is never printed.
impl fmt::Debug for ClusterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterEntry")
            .field("endpoint", &self.endpoint)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ClusterEntry {
    /// Creates a new [`ClusterEntry`].
    pub fn new(endpoint: String, user: String, password: String) -> Self {
        Self {
            endpoint,
            user,
            password: Some(password),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Removes the password from this entry and hands it to the caller.
    ///
    /// Called once the connection for this entry exists, so the secret only lives inside
    /// the cluster client afterwards.
    pub fn take_password(&mut self) -> Option<String> {
        self.password.take()
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    fn from_yaml(item: &Value) -> Result<Self, ConfigError> {
        let field = |key: &'static str| {
            item.get(key)
                .map(yaml_to_string)
                .ok_or_else(|| ConfigError::MissingField {
                    field: key,
                    entry: redacted(item),
                })
        };
        let endpoint = field("endpoint")?;
        let password = field("password")?;
        let user = field("user")?;
        Ok(Self::new(endpoint, user, password))
    }
}

fn yaml_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn redacted(item: &Value) -> String {
    let mut copy = item.clone();
    if let Some(map) = copy.as_mapping_mut() {
        if map.contains_key("password") {
            map.insert(
                Value::String("password".into()),
                Value::String("***".into()),
            );
        }
    }
    serde_yaml::to_string(&copy)
        .map(|s| s.trim_end().replace('\n', ", "))
        .unwrap_or_default()
}

fn is_blank(document: &Value) -> bool {
    match document {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Tagged(tagged) => is_blank(&tagged.value),
    }
}

/// Parses the content of a cluster file.
///
/// Returns the usable entries in file order together with the per-entry problems that
/// caused other entries to be skipped. A document without data (blank, `~`, `[]`, `{}`,
/// `""`, `false` or `0`) is [`StartupError::ConfigEmpty`]; any other document that is not a
/// sequence of mappings is [`StartupError::ConfigInvalid`].
pub fn parse_cluster_entries(
    content: &str,
) -> Result<(Vec<ClusterEntry>, Vec<ConfigError>), StartupError> {
    if content.trim().is_empty() {
        return Err(StartupError::ConfigEmpty);
    }
    let document: Value =
        serde_yaml::from_str(content).map_err(|e| StartupError::ConfigInvalid(e.to_string()))?;
    if is_blank(&document) {
        return Err(StartupError::ConfigEmpty);
    }
    let items = match document {
        Value::Sequence(items) => items,
        _ => {
            return Err(StartupError::ConfigInvalid(
                "expected a list of cluster entries".to_string(),
            ))
        }
    };

    let mut entries = Vec::new();
    let mut skipped = Vec::new();
    for item in &items {
        if !item.is_mapping() {
            return Err(StartupError::ConfigInvalid(format!(
                "unexpected item in cluster list: {:?}",
                item
            )));
        }
        let Some(cluster) = item.get("cluster") else {
            continue;
        };
        match ClusterEntry::from_yaml(cluster) {
            Ok(entry) => entries.push(entry),
            Err(e) => skipped.push(e),
        }
    }
    Ok((entries, skipped))
}

/// Reads and parses the cluster file at `path`, logging every skipped entry.
pub fn load_cluster_file(path: &Path) -> Result<Vec<ClusterEntry>, StartupError> {
    let content = std::fs::read_to_string(path).map_err(|e| StartupError::ConfigUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let (entries, skipped) = parse_cluster_entries(&content)?;
    for e in &skipped {
        error!("{}", e);
    }
    Ok(entries)
}
