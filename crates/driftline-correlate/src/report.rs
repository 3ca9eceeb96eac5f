//! Human-readable analysis report

use std::fmt;

use crate::{DriftComparator, Estimates, RelativeDrift};

/// Per-node summaries followed by the pairwise drift, when available
#[derive(Clone, Debug)]
pub struct Report<'a> {
    pub estimates: &'a Estimates,
    pub relative: Option<RelativeDrift>,
}

impl<'a> Report<'a> {
    pub fn new(estimates: &'a Estimates, comparator: &DriftComparator) -> Self {
        Report {
            estimates,
            relative: comparator.relative(estimates),
        }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, est) in self.estimates {
            writeln!(f, "Node {} (node <-> collector) network delay (ms):", node)?;
            writeln!(f, "  samples : {}", est.samples)?;
            writeln!(f, "  mean    : {:.3} ms", est.mean_delay_ms)?;
            writeln!(f, "  std     : {:.3} ms", est.std_delay_ms)?;
            writeln!(
                f,
                "  min, max: {:.3} ms , {:.3} ms",
                est.min_delay_ms, est.max_delay_ms
            )?;
            writeln!(f, "  drift   : {:.2} ppm", est.drift_ppm)?;
            writeln!(f)?;
        }

        if let Some(rel) = &self.relative {
            writeln!(
                f,
                "Clock drift {} vs {} ≈ {:.2} ppm",
                rel.node_a, rel.node_b, rel.drift_ppm
            )?;
        }

        Ok(())
    }
}
