use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use driftline_core::{DriftlineError, DriftlineResult};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`. Events go to stderr so
/// command output on stdout stays clean.
pub fn init_telemetry(log_level: &str, json: bool) -> DriftlineResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| DriftlineError::Config(format!("telemetry: {e}")))
}
