use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use driftline_cli::config::AgentServiceConfig;
use driftline_cli::{cancel_on_shutdown, init_telemetry};
use driftline_runtime::{synthetic_sensor, ExhaustionBackoff, SensorAgent, UdpSink};

#[tokio::main]
async fn main() {
    let config = match AgentServiceConfig::from_env() {
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

    let (runtime, dest) = match (config.runtime_config(), config.collector_addr()) {
        (Ok(runtime), Ok(dest)) => (runtime, dest),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let sink = match UdpSink::connect(dest).await {
        Ok(sink) => sink,
        Err(e) => {
            error!(error = %e, "failed to open socket");
            std::process::exit(1);
        }
    };

    // Random walk inside the accepted window, occasionally out of it
    let sampler = synthetic_sensor(config.seed, config.sample_min, config.sample_max);

    // Back off from 5 ms up to one period while sends run out of buffers
    let reclaim = ExhaustionBackoff::new(Duration::from_millis(5), runtime.period);

    info!(node = %runtime.node, collector = %sink.dest(), "reporting");

    let token = CancellationToken::new();
    cancel_on_shutdown(token.clone());

    let mut agent = SensorAgent::new(runtime, sampler, sink).with_reclaim(reclaim);
    let stats = agent.run(token).await;
    info!(
        cycles = stats.cycles,
        sent = stats.sent,
        exhausted = stats.exhausted,
        "agent shut down"
    );
}
