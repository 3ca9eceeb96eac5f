use tracing::{error, info};

use driftline_cli::config::AnalysisServiceConfig;
use driftline_cli::init_telemetry;
use driftline_correlate::{export_trace, residual_trace, CorrelationEngine, Report};

fn main() {
    let mut config = match AnalysisServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = std::env::args().nth(1) {
        config.log_path = path;
    }

    if let Err(e) = init_telemetry(&config.log_level, config.log_json) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    let engine = CorrelationEngine::with_config(config.engine_config());
    let analysis = match engine.analyze_log(&config.log_path) {
        Ok(analysis) => analysis,
        Err(e) => {
            error!(error = %e, "analysis failed");
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    print!("{}", Report::new(&analysis.estimates, &config.comparator()));

    if let Some(trace_path) = &config.trace_path {
        let points = residual_trace(&analysis.series, &analysis.estimates);
        if let Err(e) = export_trace(trace_path, &points) {
            error!(error = %e, "trace export failed");
            std::process::exit(1);
        }
        info!(path = %trace_path, points = points.len(), "residual trace written");
    }
}
