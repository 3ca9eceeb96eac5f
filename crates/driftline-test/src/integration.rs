//! End-to-end Scenarios
//!
//! Scenarios that drive the complete driftline flow:
//! - Simulated drifting nodes written through the file log and analyzed
//! - A live agent reporting over loopback UDP to a running collector

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use driftline_core::{DriftlineError, DriftlineResult, NodeTag};
use driftline_correlate::{CorrelationEngine, DriftComparator, Estimates, RelativeDrift};
use driftline_journal::{read_series, FileLog, LogRecord, RecordSink};
use driftline_runtime::{
    AgentConfig, AgentStats, Collector, CollectorConfig, CollectorStats, SensorAgent, UdpSink,
};

use crate::simulator::{ClockModel, DelayModel, SyncSimulator};

// ============================================================================
// OFFLINE SCENARIO
// ============================================================================

/// Simulated log scenario configuration
#[derive(Clone, Debug)]
pub struct DriftScenarioConfig {
    pub seed: u64,
    pub nodes: Vec<ClockModel>,
    pub delay: DelayModel,
    /// Reports per node
    pub samples: usize,
    /// Seconds between reports
    pub period: f64,
}

impl DriftScenarioConfig {
    /// Two nodes, 20 ppm fast and 5 ppm slow
    pub fn pair() -> Self {
        Self {
            seed: 42,
            nodes: vec![
                ClockModel::new("A", 20.0, 0.5),
                ClockModel::new("B", -5.0, 2.25).starting_at(3_000_000),
            ],
            delay: DelayModel::lan(),
            samples: 250,
            period: 1.0,
        }
    }

    pub fn single(drift_ppm: f64, intercept: f64) -> Self {
        Self {
            nodes: vec![ClockModel::new("A", drift_ppm, intercept)],
            ..Self::pair()
        }
    }
}

/// Result of an offline scenario
#[derive(Debug)]
pub struct DriftScenarioResult {
    pub estimates: Estimates,
    pub relative: Option<RelativeDrift>,
    /// (node, true drift ppm, estimated drift ppm)
    pub drift: Vec<(String, f64, Option<f64>)>,
}

impl DriftScenarioResult {
    /// Largest estimation error over all nodes, `None` if any node was dropped
    pub fn max_error_ppm(&self) -> Option<f64> {
        self.drift.iter().try_fold(0.0f64, |worst, (_, truth, est)| {
            est.map(|e| worst.max((e - truth).abs()))
        })
    }

    pub fn within(&self, tolerance_ppm: f64) -> bool {
        self.max_error_ppm().is_some_and(|e| e <= tolerance_ppm)
    }
}

/// Append records through the file log, as the collector would
pub fn write_log(path: &Path, records: &[LogRecord]) -> DriftlineResult<()> {
    let mut log = FileLog::open(path)?;
    for r in records {
        log.append(r)?;
    }
    Ok(())
}

/// Simulate, log and analyze
pub fn run_drift_scenario(
    config: &DriftScenarioConfig,
    log_path: &Path,
) -> DriftlineResult<DriftScenarioResult> {
    let mut sim = SyncSimulator::new(config.seed, config.period, config.delay);
    for node in &config.nodes {
        sim.add_node(node.clone());
    }
    write_log(log_path, &sim.records(config.samples, 10.0))?;

    let estimates = CorrelationEngine::new().analyze(log_path)?;
    let relative = DriftComparator::default().relative(&estimates);
    let drift = config
        .nodes
        .iter()
        .map(|m| {
            let est = estimates.get(&m.node).map(|e| e.drift_ppm);
            (m.node.clone(), m.drift_ppm, est)
        })
        .collect();

    Ok(DriftScenarioResult {
        estimates,
        relative,
        drift,
    })
}

// ============================================================================
// LIVE PIPELINE
// ============================================================================

/// Result of a live agent to collector run
#[derive(Debug)]
pub struct PipelineResult {
    pub agent: AgentStats,
    pub collector: CollectorStats,
    pub estimates: Estimates,
}

/// Run one agent against a loopback collector for `reports` cycles, then
/// analyze what the collector logged.
pub async fn run_live_pipeline(
    node: &str,
    log_path: &Path,
    reports: usize,
    spacing: Duration,
) -> DriftlineResult<PipelineResult> {
    let config = CollectorConfig {
        bind_addr: "127.0.0.1:0"
            .parse()
            .map_err(|e| DriftlineError::Config(format!("{e}")))?,
        ..Default::default()
    };
    let mut collector = Collector::open(config, log_path).await?;
    let addr = collector.local_addr();

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    let handle = tokio::spawn(async move {
        let result = collector.run(stop).await;
        result.map(|()| collector.stats().clone())
    });

    let agent_config = AgentConfig {
        node: NodeTag::new(node),
        period: spacing,
        ..Default::default()
    };
    let mut value = 0.0f32;
    let sampler = move || {
        value += 0.5;
        Some(value)
    };
    let mut agent = SensorAgent::new(agent_config, sampler, UdpSink::connect(addr).await?);
    for _ in 0..reports {
        agent.cycle().await;
        tokio::time::sleep(spacing).await;
    }

    // Wait for the collector to drain the socket
    for _ in 0..200 {
        let (series, _) = read_series(log_path)?;
        if series.get(node).map_or(0, |s| s.len()) >= reports {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cancel.cancel();

    let collector = handle
        .await
        .map_err(|e| DriftlineError::Transport(e.to_string()))??;
    let estimates = CorrelationEngine::new().analyze(log_path)?;

    Ok(PipelineResult {
        agent: agent.stats().clone(),
        collector,
        estimates,
    })
}
