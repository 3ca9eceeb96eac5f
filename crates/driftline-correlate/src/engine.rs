//! Correlation engine - log in, per-node estimates out

use std::collections::BTreeMap;
use std::path::Path;

use driftline_core::DriftlineResult;
use driftline_journal::{read_series, ReadStats, SeriesSet};

use crate::{DriftEstimate, MIN_SAMPLES};

/// Estimates keyed by node id, sorted
pub type Estimates = BTreeMap<String, DriftEstimate>;

/// Correlation engine configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Nodes with fewer samples are left out of the result
    pub min_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            min_samples: MIN_SAMPLES,
        }
    }
}

/// Everything one pass over a log produced
#[derive(Clone, Debug)]
pub struct Analysis {
    pub estimates: Estimates,
    pub series: SeriesSet,
    pub read: ReadStats,
}

/// Batch correlation over a collector log
#[derive(Clone, Debug, Default)]
pub struct CorrelationEngine {
    config: EngineConfig,
}

impl CorrelationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        CorrelationEngine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Estimate drift and delay for every node in a log.
    ///
    /// Only opening the file can fail; bad rows and unfit nodes are skipped.
    pub fn analyze(&self, log_path: impl AsRef<Path>) -> DriftlineResult<Estimates> {
        Ok(self.analyze_log(log_path)?.estimates)
    }

    /// Like `analyze`, keeping the parsed series for trace export
    pub fn analyze_log(&self, log_path: impl AsRef<Path>) -> DriftlineResult<Analysis> {
        let (series, read) = read_series(log_path)?;
        let estimates = self.analyze_series(&series);
        Ok(Analysis {
            estimates,
            series,
            read,
        })
    }

    /// Fit every series independently
    pub fn analyze_series(&self, series: &SeriesSet) -> Estimates {
        let mut estimates = Estimates::new();

        for (node, node_series) in series {
            match DriftEstimate::from_series(node, node_series, self.config.min_samples) {
                Ok(estimate) => {
                    tracing::debug!(
                        node = %node,
                        samples = estimate.samples,
                        drift_ppm = estimate.drift_ppm,
                        "node fitted"
                    );
                    estimates.insert(node.clone(), estimate);
                }
                Err(e) => tracing::info!(node = %node, reason = %e, "node excluded"),
            }
        }

        estimates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_log(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_three_row_scenario() {
        let log = write_log(
            "pico_time_s,node,esp_time_s,dist_cm\n\
             10.000000,A,0.000000,5.0\n\
             11.000000,A,1.000000,5.0\n\
             12.000000,A,2.000000,5.0\n",
        );
        let engine = CorrelationEngine::with_config(EngineConfig { min_samples: 3 });
        let estimates = engine.analyze(log.path()).unwrap();

        let a = &estimates["A"];
        assert_eq!(a.slope, 1.0);
        assert_eq!(a.intercept, 10.0);
        assert_eq!(a.drift_ppm, 0.0);
        assert_eq!(a.mean_delay_ms, 0.0);

        // the default threshold leaves the same node out entirely
        let estimates = CorrelationEngine::new().analyze(log.path()).unwrap();
        assert!(estimates.is_empty());
    }

    #[test]
    fn test_malformed_row_ignored() {
        let mut contents = String::from("pico_time_s,node,esp_time_s,dist_cm\n");
        for i in 0..6 {
            contents.push_str(&format!("{:.6},B,{:.6},5.000\n", 100.0 + i as f64, i as f64));
            if i == 2 {
                contents.push_str("abc,B,12\n");
            }
        }
        let log = write_log(&contents);
        let estimates = CorrelationEngine::new().analyze(log.path()).unwrap();

        let b = &estimates["B"];
        assert_eq!(b.samples, 6);
        assert!((b.slope - 1.0).abs() < 1e-12);
        assert!((b.intercept - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_and_degenerate_nodes_absent() {
        let mut contents = String::new();
        for i in 0..4 {
            contents.push_str(&format!("{}.0,S,{}.0,1.0\n", i, i));
        }
        for i in 0..8 {
            contents.push_str(&format!("{}.0,C,7.0,1.0\n", i));
        }
        for i in 0..8 {
            contents.push_str(&format!("{}.5,G,{}.0,1.0\n", i, i));
        }
        let log = write_log(&contents);
        let estimates = CorrelationEngine::new().analyze(log.path()).unwrap();

        assert!(!estimates.contains_key("S"));
        assert!(!estimates.contains_key("C"));
        assert!(estimates.contains_key("G"));
    }

    #[test]
    fn test_missing_log_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CorrelationEngine::new()
            .analyze(dir.path().join("absent.csv"))
            .is_err());
    }
}
