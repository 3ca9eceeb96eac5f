use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use driftline_cli::config::CollectorServiceConfig;
use driftline_cli::{cancel_on_shutdown, init_telemetry};
use driftline_runtime::run_collector;

#[tokio::main]
async fn main() {
    let config = match CollectorServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&config.log_level, config.log_json) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    let runtime = match config.runtime_config() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let token = CancellationToken::new();
    cancel_on_shutdown(token.clone());

    match run_collector(runtime, Path::new(&config.log_path), token).await {
        Ok(stats) => {
            info!(
                accepted = stats.accepted,
                discarded = stats.discarded,
                append_failures = stats.append_failures,
                "collector shut down"
            );
        }
        Err(e) => {
            error!(error = %e, "collector failed");
            std::process::exit(1);
        }
    }
}
