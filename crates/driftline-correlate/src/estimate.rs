//! Per-node drift and delay estimate

use driftline_core::{DriftlineError, DriftlineResult};
use driftline_journal::NodeSeries;

use crate::LinearFit;

/// Fewest samples a node needs before it is fitted
pub const MIN_SAMPLES: usize = 5;

/// Drift and apparent-delay statistics for one node
#[derive(Clone, Debug, PartialEq)]
pub struct DriftEstimate {
    /// Fitted slope `a`
    pub slope: f64,
    /// Fitted intercept `b`, seconds
    pub intercept: f64,
    /// `(a − 1) · 1e6`
    pub drift_ppm: f64,
    pub mean_delay_ms: f64,
    /// Population standard deviation
    pub std_delay_ms: f64,
    pub min_delay_ms: f64,
    pub max_delay_ms: f64,
    pub samples: usize,
    /// The underlying fit, kept for residual traces
    pub fit: LinearFit,
}

impl DriftEstimate {
    /// Fit one node's series and summarize its residuals.
    ///
    /// Fails with `InsufficientData` below `min_samples` and with
    /// `DegenerateRegression` when the device clock never moves.
    pub fn from_series(node: &str, series: &NodeSeries, min_samples: usize) -> DriftlineResult<Self> {
        let n = series.len();
        if n < min_samples.max(1) {
            return Err(DriftlineError::InsufficientData {
                node: node.to_string(),
                samples: n,
            });
        }

        let fit = LinearFit::fit(&series.samples).ok_or_else(|| DriftlineError::DegenerateRegression {
            node: node.to_string(),
        })?;

        let residuals_ms: Vec<f64> = series
            .samples
            .iter()
            .map(|s| fit.residual(s) * 1000.0)
            .collect();

        let count = n as f64;
        let mean = residuals_ms.iter().sum::<f64>() / count;
        let var = residuals_ms
            .iter()
            .map(|r| {
                let d = r - mean;
                d * d
            })
            .sum::<f64>()
            / count;
        let min = residuals_ms.iter().copied().fold(f64::INFINITY, f64::min);
        let max = residuals_ms.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(DriftEstimate {
            slope: fit.slope,
            intercept: fit.intercept,
            drift_ppm: fit.drift_ppm(),
            mean_delay_ms: mean,
            std_delay_ms: var.sqrt(),
            min_delay_ms: min,
            max_delay_ms: max,
            samples: n,
            fit,
        })
    }
}
