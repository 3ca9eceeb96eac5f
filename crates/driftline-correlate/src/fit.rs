//! Least-squares clock mapping
//!
//! Both clocks carry large absolute values (collector uptime, device counter)
//! while the quantities of interest are parts per million of their spans.
//! Summing raw squares would cancel away most of the mantissa, so both
//! series are shifted to start at zero before the sums are accumulated and
//! the intercept is shifted back afterwards.
//!
//! The device counter wraps every ~71.6 minutes. A wrap inside the fitted
//! window shows up as a discontinuity the linear model cannot absorb; it is
//! not detected or unwrapped here.

use driftline_journal::SyncSample;

/// Fitted mapping `collector_time ≈ slope · device_time + intercept`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    /// Intercept on the absolute time scale
    pub intercept: f64,
    /// First device time (recentering origin)
    pub device_origin: f64,
    /// First collector time (recentering origin)
    pub collector_origin: f64,
    /// Intercept in recentered coordinates
    pub centered_intercept: f64,
}

impl LinearFit {
    /// Fit by ordinary least squares with device time as the regressor.
    ///
    /// Returns `None` for an empty series or when the device times have no
    /// variance (`n·Σx² − (Σx)² == 0`).
    pub fn fit(samples: &[SyncSample]) -> Option<Self> {
        let first = samples.first()?;
        let te0 = first.device_time;
        let tp0 = first.collector_time;
        let n = samples.len() as f64;

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_xx = 0.0;
        let mut sum_xy = 0.0;

        for s in samples {
            let x = s.device_time - te0;
            let y = s.collector_time - tp0;
            sum_x += x;
            sum_y += y;
            sum_xx += x * x;
            sum_xy += x * y;
        }

        let denom = n * sum_xx - sum_x * sum_x;
        if denom == 0.0 {
            return None;
        }

        let slope = (n * sum_xy - sum_x * sum_y) / denom;
        let centered_intercept = (sum_y - slope * sum_x) / n;

        Some(LinearFit {
            slope,
            intercept: centered_intercept + tp0 - slope * te0,
            device_origin: te0,
            collector_origin: tp0,
            centered_intercept,
        })
    }

    /// Predicted collector time for a device time
    #[inline]
    pub fn predict(&self, device_time: f64) -> f64 {
        self.slope * device_time + self.intercept
    }

    /// `collector − (a·device + b)` in seconds.
    ///
    /// Evaluated in recentered coordinates; algebraically the same as the
    /// absolute form without the large-magnitude cancellation.
    #[inline]
    pub fn residual(&self, sample: &SyncSample) -> f64 {
        let x = sample.device_time - self.device_origin;
        let y = sample.collector_time - self.collector_origin;
        y - (self.slope * x + self.centered_intercept)
    }

    /// Clock-rate error relative to the collector, parts per million
    #[inline]
    pub fn drift_ppm(&self) -> f64 {
        (self.slope - 1.0) * 1_000_000.0
    }
}
