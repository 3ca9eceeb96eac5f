//! Append-only record sinks

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use driftline_core::{DriftlineError, DriftlineResult};

use crate::{LogRecord, LOG_HEADER};

/// Destination for accepted records
pub trait RecordSink {
    /// Append one record. Returns once the record is durable.
    fn append(&mut self, record: &LogRecord) -> DriftlineResult<()>;
}

/// On-disk log. Every append is written, flushed and synced before it returns.
#[derive(Debug)]
pub struct FileLog {
    file: File,
    path: PathBuf,
}

impl FileLog {
    /// Open (or create) a log for append.
    ///
    /// A header is written only when the file is empty, so restarting the
    /// collector against an existing log does not repeat it.
    pub fn open(path: impl AsRef<Path>) -> DriftlineResult<Self> {
        let path = path.as_ref().to_path_buf();
        let open_err = |e: std::io::Error| DriftlineError::LogOpen(format!("{}: {}", path.display(), e));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_err)?;

        let len = file.metadata().map_err(open_err)?.len();
        if len == 0 {
            file.write_all(format!("{LOG_HEADER}\n").as_bytes())
                .and_then(|_| file.sync_data())
                .map_err(open_err)?;
            tracing::debug!(path = %path.display(), "wrote log header");
        }

        Ok(FileLog { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileLog {
    fn append(&mut self, record: &LogRecord) -> DriftlineResult<()> {
        self.file
            .write_all(record.to_row().as_bytes())
            .and_then(|_| self.file.flush())
            .and_then(|_| self.file.sync_data())
            .map_err(|e| DriftlineError::LogAppend(format!("{}: {}", self.path.display(), e)))
    }
}

/// In-memory sink. Clones share the same record list.
#[derive(Clone, Debug, Default)]
pub struct MemoryLog {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl RecordSink for MemoryLog {
    fn append(&mut self, record: &LogRecord) -> DriftlineResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(t: f64) -> LogRecord {
        LogRecord {
            collector_time: t,
            node: "A".into(),
            device_time: t - 1.0,
            measurement: 10.0,
        }
    }

    #[test]
    fn test_file_log_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");

        {
            let mut log = FileLog::open(&path).unwrap();
            log.append(&record(1.0)).unwrap();
        }
        {
            let mut log = FileLog::open(&path).unwrap();
            log.append(&record(2.0)).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "pico_time_s,node,esp_time_s,dist_cm\n\
             1.000000,A,0.000000,10.000\n\
             2.000000,A,1.000000,10.000\n"
        );
    }

    #[test]
    fn test_file_log_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("log.csv");
        assert!(matches!(FileLog::open(&path), Err(DriftlineError::LogOpen(_))));
    }

    #[test]
    fn test_memory_log_shared() {
        let log = MemoryLog::new();
        let mut writer = log.clone();
        writer.append(&record(1.0)).unwrap();
        writer.append(&record(2.0)).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[1].collector_time, 2.0);
    }
}
