//! Residual trace export
//!
//! One row per sample of every fitted node: time since the first sample in
//! the log and the apparent delay after removing the clock fit. This is the
//! series a jitter chart is drawn from; charting happens elsewhere.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use driftline_core::{DriftlineError, DriftlineResult};
use driftline_journal::SeriesSet;

use crate::Estimates;

/// Header of an exported trace
pub const TRACE_HEADER: &str = "node,t_s,residual_ms";

/// One point of a residual trace
#[derive(Clone, Debug, PartialEq)]
pub struct TracePoint {
    pub node: String,
    /// Seconds since the earliest collector time in the log
    pub t_s: f64,
    pub residual_ms: f64,
}

/// Residuals over time for each fitted node, in log order per node
pub fn residual_trace(series: &SeriesSet, estimates: &Estimates) -> Vec<TracePoint> {
    let t0 = series
        .values()
        .flat_map(|s| s.samples.iter().map(|p| p.collector_time))
        .fold(f64::INFINITY, f64::min);

    let mut points = Vec::new();
    for (node, est) in estimates {
        let Some(node_series) = series.get(node) else {
            continue;
        };
        points.extend(node_series.samples.iter().map(|s| TracePoint {
            node: node.clone(),
            t_s: s.collector_time - t0,
            residual_ms: est.fit.residual(s) * 1000.0,
        }));
    }
    points
}

/// Write trace points as CSV
pub fn write_trace<W: Write>(out: W, points: &[TracePoint]) -> io::Result<()> {
    let mut out = BufWriter::new(out);
    writeln!(out, "{}", TRACE_HEADER)?;
    for p in points {
        writeln!(out, "{},{:.6},{:.3}", p.node, p.t_s, p.residual_ms)?;
    }
    out.flush()
}

/// Write trace points to a file, replacing it
pub fn export_trace(path: impl AsRef<Path>, points: &[TracePoint]) -> DriftlineResult<()> {
    let path = path.as_ref();
    let err = |e: io::Error| DriftlineError::Output(format!("{}: {}", path.display(), e));
    let file = File::create(path).map_err(err)?;
    write_trace(file, points).map_err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CorrelationEngine;
    use driftline_journal::{NodeSeries, SyncSample};

    fn series_set() -> SeriesSet {
        let mut set = SeriesSet::new();
        set.insert(
            "A".into(),
            NodeSeries {
                samples: (0..6)
                    .map(|i| SyncSample {
                        collector_time: 50.0 + i as f64,
                        device_time: i as f64,
                    })
                    .collect(),
            },
        );
        set.insert(
            "Z".into(),
            NodeSeries {
                samples: vec![SyncSample {
                    collector_time: 49.0,
                    device_time: 0.0,
                }],
            },
        );
        set
    }

    #[test]
    fn test_trace_relative_to_first_sample() {
        let set = series_set();
        let estimates = CorrelationEngine::new().analyze_series(&set);
        let points = residual_trace(&set, &estimates);

        // Z is too short to fit but still defines t0
        assert_eq!(points.len(), 6);
        assert!(points.iter().all(|p| p.node == "A"));
        assert_eq!(points[0].t_s, 1.0);
        assert_eq!(points[5].t_s, 6.0);
        assert!(points.iter().all(|p| p.residual_ms.abs() < 1e-9));
    }

    #[test]
    fn test_write_trace() {
        let points = vec![TracePoint {
            node: "A".into(),
            t_s: 1.5,
            residual_ms: -0.25,
        }];
        let mut out = Vec::new();
        write_trace(&mut out, &points).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "node,t_s,residual_ms\nA,1.500000,-0.250\n"
        );
    }

    #[test]
    fn test_export_trace_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        export_trace(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "node,t_s,residual_ms\n");
    }
}
