//! Tracing subscriber setup.
use std::{fs::OpenOptions, path::Path, sync::Arc};

use tracing_subscriber::EnvFilter;

use crate::error::StartupError;

/// Filter used when `RUST_LOG` is not set.
///
/// One `--debug` enables debug output for the exporter while the HTTP client stack stays at
/// `warn`; two or more enable debug output everywhere.
pub fn default_directives(debug: u8) -> &'static str {
    match debug {
        0 => "info",
        1 => "debug,siq_stats_exporter::client=warn,reqwest=warn,hyper=warn,hyper_util=warn,rustls=warn",
        _ => "debug",
    }
}

/// Installs the global subscriber, writing to `log_file` when given and to stderr otherwise.
pub fn init_logging(debug: u8, log_file: Option<&Path>) -> Result<(), StartupError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    StartupError::Settings(format!("cannot open log file {}: {}", path.display(), e))
                })?;
            builder
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    result.map_err(|e| StartupError::Settings(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(default_directives(0), "info");
        assert!(default_directives(1).starts_with("debug,"));
        assert!(default_directives(1).contains("siq_stats_exporter::client=warn"));
        assert_eq!(default_directives(2), "debug");
        assert_eq!(default_directives(5), "debug");
    }

    #[test]
    fn directives_parse() {
        for level in 0..3 {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }
}
