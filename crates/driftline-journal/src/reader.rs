//! Batch log reader: groups samples per node in log order

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use driftline_core::{DriftlineError, DriftlineResult};

use crate::{parse_row, Row, SyncSample, LOG_COLUMNS};

/// Ordered clock pairs for one node, in receipt order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeSeries {
    pub samples: Vec<SyncSample>,
}

impl NodeSeries {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, sample: SyncSample) {
        self.samples.push(sample);
    }
}

/// All node series from one log, keyed by node id
pub type SeriesSet = BTreeMap<String, NodeSeries>;

/// Line accounting for one read
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub lines: usize,
    pub samples: usize,
    pub headers: usize,
    pub blank: usize,
    pub malformed: usize,
}

/// Read a log file from disk
pub fn read_series(path: impl AsRef<Path>) -> DriftlineResult<(SeriesSet, ReadStats)> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| DriftlineError::InputOpen(format!("{}: {}", path.display(), e)))?;
    parse_series(BufReader::new(file))
}

/// Read a log from any buffered source.
///
/// Bad rows are counted and skipped. A final line without a newline may be
/// a row still being appended: it is kept only if all `LOG_COLUMNS` columns
/// are present, so a cut can at worst shorten the unused measurement field.
pub fn parse_series<R: BufRead>(mut reader: R) -> DriftlineResult<(SeriesSet, ReadStats)> {
    let mut series = SeriesSet::new();
    let mut stats = ReadStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| DriftlineError::InputOpen(e.to_string()))?;
        if n == 0 {
            break;
        }
        stats.lines += 1;

        let Ok(line) = std::str::from_utf8(&buf) else {
            stats.malformed += 1;
            tracing::debug!(line = stats.lines, "skipping non-UTF-8 row");
            continue;
        };

        if !line.ends_with('\n') && line.split(',').count() < LOG_COLUMNS {
            stats.malformed += 1;
            tracing::debug!(line = stats.lines, "skipping incomplete trailing row");
            break;
        }

        match parse_row(line) {
            Ok(Row::Sample { node, sample }) => {
                stats.samples += 1;
                series.entry(node).or_default().push(sample);
            }
            Ok(Row::Header) => stats.headers += 1,
            Ok(Row::Blank) => stats.blank += 1,
            Err(e) => {
                stats.malformed += 1;
                tracing::debug!(line = stats.lines, error = %e, "skipping row");
            }
        }
    }

    tracing::debug!(
        lines = stats.lines,
        samples = stats.samples,
        malformed = stats.malformed,
        nodes = series.len(),
        "log parsed"
    );

    Ok((series, stats))
}
