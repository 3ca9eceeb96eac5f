//! Pairwise drift between two distinguished nodes
//!
//! Both drifts are measured against the collector clock, so their difference
//! is only as trustworthy as the collector clock is stable over the window.

use crate::Estimates;

/// Relative drift of `node_a` against `node_b`
#[derive(Clone, Debug, PartialEq)]
pub struct RelativeDrift {
    pub node_a: String,
    pub node_b: String,
    pub drift_ppm: f64,
}

/// Compares the fitted drift of a fixed pair of nodes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriftComparator {
    pub node_a: String,
    pub node_b: String,
}

impl Default for DriftComparator {
    fn default() -> Self {
        DriftComparator::new("A", "B")
    }
}

impl DriftComparator {
    pub fn new(node_a: impl Into<String>, node_b: impl Into<String>) -> Self {
        DriftComparator {
            node_a: node_a.into(),
            node_b: node_b.into(),
        }
    }

    /// `drift(a) − drift(b)` in ppm, or `None` unless both nodes were fitted
    pub fn compare(&self, estimates: &Estimates) -> Option<f64> {
        let a = estimates.get(&self.node_a)?;
        let b = estimates.get(&self.node_b)?;
        Some(a.drift_ppm - b.drift_ppm)
    }

    pub fn relative(&self, estimates: &Estimates) -> Option<RelativeDrift> {
        self.compare(estimates).map(|drift_ppm| RelativeDrift {
            node_a: self.node_a.clone(),
            node_b: self.node_b.clone(),
            drift_ppm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DriftEstimate;
    use driftline_journal::{NodeSeries, SyncSample};

    fn estimate(slope: f64) -> DriftEstimate {
        let series = NodeSeries {
            samples: (0..10)
                .map(|i| SyncSample {
                    collector_time: slope * i as f64,
                    device_time: i as f64,
                })
                .collect(),
        };
        DriftEstimate::from_series("x", &series, 5).unwrap()
    }

    #[test]
    fn test_both_present() {
        let mut estimates = Estimates::new();
        estimates.insert("A".into(), estimate(1.000_03));
        estimates.insert("B".into(), estimate(1.000_01));

        let diff = DriftComparator::default().compare(&estimates).unwrap();
        assert!((diff - 20.0).abs() < 1e-6, "diff {diff}");
    }

    #[test]
    fn test_missing_node() {
        let mut estimates = Estimates::new();
        estimates.insert("A".into(), estimate(1.0));
        assert!(DriftComparator::default().compare(&estimates).is_none());
        assert!(DriftComparator::new("B", "A").relative(&estimates).is_none());
    }

    #[test]
    fn test_custom_pair() {
        let mut estimates = Estimates::new();
        estimates.insert("north".into(), estimate(0.999_99));
        estimates.insert("south".into(), estimate(1.0));

        let rel = DriftComparator::new("north", "south")
            .relative(&estimates)
            .unwrap();
        assert!((rel.drift_ppm + 10.0).abs() < 1e-6);
        assert_eq!(rel.node_a, "north");
    }
}
