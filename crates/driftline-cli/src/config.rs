use std::net::SocketAddr;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use driftline_core::{DriftlineError, DriftlineResult, NodeTag, NODE_TAG_LEN};
use driftline_correlate::{DriftComparator, EngineConfig};
use driftline_runtime::{AgentConfig, AppendFailurePolicy, CollectorConfig};

const ENV_PREFIX: &str = "DRIFTLINE";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CollectorServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// UDP address to receive node reports on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Measurement log, appended to
    #[serde(default = "default_log_path")]
    pub log_path: String,

    /// Receive buffer size in bytes
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,

    /// What to do when a record cannot be appended (abort, skip)
    #[serde(default = "default_append_failure")]
    pub append_failure: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Node id, at most five ASCII bytes
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Collector address reports are sent to
    #[serde(default = "default_collector_addr")]
    pub collector_addr: String,

    /// Cycle period in milliseconds
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Progress is logged every this many sends
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,

    // Stand-in sampler
    /// Readings below this are treated as no measurement
    #[serde(default = "default_sample_min")]
    pub sample_min: f32,

    /// Readings above this are treated as no measurement
    #[serde(default = "default_sample_max")]
    pub sample_max: f32,

    /// Seed of the synthetic sampler
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnalysisServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_analysis_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Measurement log to analyze
    #[serde(default = "default_log_path")]
    pub log_path: String,

    /// Fewest samples a node needs to be fitted
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// First node of the relative drift pair
    #[serde(default = "default_node_a")]
    pub node_a: String,

    /// Second node of the relative drift pair
    #[serde(default = "default_node_b")]
    pub node_b: String,

    /// Residual trace CSV, written when set
    #[serde(default)]
    pub trace_path: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_analysis_log_level() -> String {
    "warn".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:9999".to_string()
}

fn default_log_path() -> String {
    "esp_dual_log.csv".to_string()
}

fn default_recv_buffer_size() -> usize {
    driftline_runtime::CollectorConfig::default().recv_buffer_size
}

fn default_append_failure() -> String {
    "abort".to_string()
}

fn default_node_id() -> String {
    "B".to_string()
}

fn default_collector_addr() -> String {
    "127.0.0.1:9999".to_string()
}

fn default_period_ms() -> u64 {
    40
}

fn default_progress_every() -> u64 {
    20
}

fn default_sample_min() -> f32 {
    2.0
}

fn default_sample_max() -> f32 {
    30.0
}

fn default_min_samples() -> usize {
    driftline_correlate::MIN_SAMPLES
}

fn default_node_a() -> String {
    "A".to_string()
}

fn default_node_b() -> String {
    "B".to_string()
}

fn parse_addr(field: &str, value: &str) -> DriftlineResult<SocketAddr> {
    value
        .parse()
        .map_err(|e| DriftlineError::Config(format!("{field} {value:?}: {e}")))
}

fn load<T: for<'de> Deserialize<'de>>() -> Result<T, ConfigError> {
    Config::builder()
        .add_source(Environment::with_prefix(ENV_PREFIX))
        .build()?
        .try_deserialize()
}

impl CollectorServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load()
    }

    pub fn runtime_config(&self) -> DriftlineResult<CollectorConfig> {
        Ok(CollectorConfig {
            bind_addr: parse_addr("bind_addr", &self.bind_addr)?,
            recv_buffer_size: self.recv_buffer_size,
            append_failure: self.append_failure.parse::<AppendFailurePolicy>()?,
        })
    }
}

impl Default for CollectorServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            bind_addr: default_bind_addr(),
            log_path: default_log_path(),
            recv_buffer_size: default_recv_buffer_size(),
            append_failure: default_append_failure(),
        }
    }
}

impl AgentServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load()
    }

    pub fn collector_addr(&self) -> DriftlineResult<SocketAddr> {
        parse_addr("collector_addr", &self.collector_addr)
    }

    pub fn runtime_config(&self) -> DriftlineResult<AgentConfig> {
        let id = self.node_id.trim();
        if id.is_empty() || id.len() > NODE_TAG_LEN {
            return Err(DriftlineError::Config(format!(
                "node_id {:?} must be 1 to {} bytes",
                self.node_id, NODE_TAG_LEN
            )));
        }
        if self.period_ms == 0 {
            return Err(DriftlineError::Config("period_ms must be positive".into()));
        }

        Ok(AgentConfig {
            node: NodeTag::new(id),
            period: Duration::from_millis(self.period_ms),
            progress_every: self.progress_every,
        })
    }
}

impl Default for AgentServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            node_id: default_node_id(),
            collector_addr: default_collector_addr(),
            period_ms: default_period_ms(),
            progress_every: default_progress_every(),
            sample_min: default_sample_min(),
            sample_max: default_sample_max(),
            seed: 0,
        }
    }
}

impl AnalysisServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            min_samples: self.min_samples,
        }
    }

    pub fn comparator(&self) -> DriftComparator {
        DriftComparator::new(self.node_a.clone(), self.node_b.clone())
    }
}

impl Default for AnalysisServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_analysis_log_level(),
            log_json: false,
            log_path: default_log_path(),
            min_samples: default_min_samples(),
            node_a: default_node_a(),
            node_b: default_node_b(),
            trace_path: None,
        }
    }
}
