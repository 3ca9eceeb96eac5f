//! Log record and its text row format

use std::fmt;

use driftline_core::{DriftlineError, DriftlineResult};

/// Header line written at the top of a new log
pub const LOG_HEADER: &str = "pico_time_s,node,esp_time_s,dist_cm";

/// Prefix identifying a header line
pub const HEADER_PREFIX: &str = "pico_time_s";

/// Columns in a complete row
pub const LOG_COLUMNS: usize = 4;

/// One accepted measurement, stamped with the collector's clock
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    /// Collector clock at receipt, seconds
    pub collector_time: f64,
    /// Originating node
    pub node: String,
    /// Node clock at sampling, seconds
    pub device_time: f64,
    /// Sensor reading
    pub measurement: f32,
}

impl LogRecord {
    /// Render as a newline-terminated row
    pub fn to_row(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6},{},{:.6},{:.3}",
            self.collector_time, self.node, self.device_time, self.measurement
        )
    }
}

/// True when `node` can sit in the node column without breaking the row:
/// not blank, and free of commas and control characters (CR, LF, NUL).
pub fn is_loggable_node(node: &str) -> bool {
    !node.trim().is_empty() && !node.chars().any(|c| c == ',' || c.is_control())
}

/// The clock pair a correlation pass needs from one row
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncSample {
    /// Collector clock, seconds
    pub collector_time: f64,
    /// Device clock, seconds
    pub device_time: f64,
}

/// Classification of one log line
#[derive(Clone, Debug, PartialEq)]
pub enum Row {
    Header,
    Blank,
    Sample { node: String, sample: SyncSample },
}

/// Classify one line (without its terminator).
///
/// Only the first three fields are required; the measurement column is not
/// needed for correlation and is not validated.
pub fn parse_row(line: &str) -> DriftlineResult<Row> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Row::Blank);
    }
    if line.starts_with(HEADER_PREFIX) {
        return Ok(Row::Header);
    }

    let mut fields = line.split(',');
    let (Some(collector), Some(node), Some(device)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(DriftlineError::MalformedRow(format!(
            "expected at least 3 fields: {line:?}"
        )));
    };

    let collector_time = parse_seconds(collector)?;
    let device_time = parse_seconds(device)?;

    let node = node.trim();
    if node.is_empty() {
        return Err(DriftlineError::MalformedRow("empty node id".into()));
    }

    Ok(Row::Sample {
        node: node.to_string(),
        sample: SyncSample {
            collector_time,
            device_time,
        },
    })
}

fn parse_seconds(field: &str) -> DriftlineResult<f64> {
    let field = field.trim();
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DriftlineError::MalformedRow(format!(
            "not a time value: {field:?}"
        ))),
    }
}
