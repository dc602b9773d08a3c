//! Command line parsing and settings layering.
//!
//! Parameters are resolved in the following order, later layers winning:
//! command line options (including their defaults) < environment variables.
//! The environment variable for an option is its upper case name prefixed with
//! `PS_SIQ_STATS_`, e.g. `--log-file` becomes `PS_SIQ_STATS_LOG_FILE`.
use std::{net::IpAddr, path::PathBuf};

use clap::Parser;
use ext_config::{Config, Environment, Map};

use crate::{
    config::{ExporterSettings, DEFAULT_SERVER_PORT, ENV_PREFIX},
    error::StartupError,
};

const AFTER_HELP: &str = "\
The cluster file is a YAML list of cluster entries:

---
- cluster:
    user: \"\"
    password: \"\"
    endpoint: \"\"

The endpoint can be an IP address or FQDN, with the port number if required.
The user needs the ISI_PRIV_LOGIN_PAPI and ISI_PRIV_SYNCIQ read privileges.

Return values:
  0   No errors
  1   CLI argument errors
  2   Cluster client could not be created
  3   YAML configuration file load error or empty file
  4   YAML configuration file parse error
  5   No cluster endpoints found";

/// Prometheus exporter for SyncIQ replication recovery points.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, after_help = AFTER_HELP)]
pub struct Args {
    /// YAML formatted configuration file with user, password, and endpoint sets.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Port number for listening to Prometheus polls.
    #[arg(long, default_value_t = DEFAULT_SERVER_PORT)]
    pub port: u16,
    /// Address the metrics server binds to.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,
    /// Add multiple debug flags to increase debug.
    #[arg(long, action = clap::ArgAction::Count)]
    pub debug: u8,
    /// Write logs to this file instead of stderr.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
    /// Collect once, print the recovery points and exit.
    #[arg(long)]
    pub once: bool,
}

impl Args {
    /// Layers environment variables over these arguments.
    pub fn into_settings(self) -> Result<ExporterSettings, StartupError> {
        self.into_settings_with_env(None)
    }

    /// Same as [`Args::into_settings`], reading variables from `env` instead of the process
    /// environment when given.
    pub fn into_settings_with_env(
        self,
        env: Option<Map<String, String>>,
    ) -> Result<ExporterSettings, StartupError> {
        let mut builder = Config::builder()
            .set_default("port", i64::from(self.port))
            .and_then(|b| b.set_default("bind", self.bind.to_string()))
            .and_then(|b| b.set_default("debug", i64::from(self.debug)))
            .and_then(|b| b.set_default("once", self.once))
            .map_err(|e| StartupError::Settings(e.to_string()))?;
        if let Some(config) = self.config {
            builder = builder
                .set_default("config", config.to_string_lossy().into_owned())
                .map_err(|e| StartupError::Settings(e.to_string()))?;
        }
        if let Some(log_file) = self.log_file {
            builder = builder
                .set_default("log_file", log_file.to_string_lossy().into_owned())
                .map_err(|e| StartupError::Settings(e.to_string()))?;
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .and_then(|c| c.try_deserialize::<ExporterSettings>())
            .map_err(|e| StartupError::Settings(e.to_string()))
    }
}

/// Parses the process arguments and environment into [`ExporterSettings`].
pub fn process_cli_args() -> Result<ExporterSettings, StartupError> {
    Args::parse().into_settings()
}
