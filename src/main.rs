use std::process::ExitCode;

use siq_stats_exporter::{args::process_cli_args, logging::init_logging, SiqStatsExporter};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match process_cli_args() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    if let Err(e) = init_logging(settings.debug(), settings.log_file()) {
        eprintln!("{}", e);
        return ExitCode::from(e.exit_code());
    }

    match SiqStatsExporter::new(settings).start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
