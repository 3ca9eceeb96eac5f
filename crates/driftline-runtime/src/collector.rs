//! Collector - receive loop and per-record append
//!
//! One datagram at a time: receive, stamp with the collector clock, decode,
//! append. Nothing is buffered between cycles, so records land in the log in
//! receipt order.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;

use driftline_core::{DriftlineError, DriftlineResult};
use driftline_journal::{is_loggable_node, FileLog, LogRecord, RecordSink};
use driftline_transport::{UdpTransport, RECV_BUFFER_SIZE};
use driftline_wire::MeasurementPacket;

/// Longest pause after repeated receive errors
pub const MAX_RECV_BACKOFF: Duration = Duration::from_secs(1);

/// Repeated receive errors are logged once per this many
const RECV_ERROR_LOG_EVERY: u32 = 100;

/// Pause before the next receive after `consecutive` errors in a row
pub fn recv_error_backoff(consecutive: u32) -> Duration {
    if consecutive == 0 {
        return Duration::ZERO;
    }
    let shift = (consecutive - 1).min(10);
    Duration::from_millis(1 << shift).min(MAX_RECV_BACKOFF)
}

/// What to do when a record cannot be appended mid-run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AppendFailurePolicy {
    /// Stop the loop and return the error
    #[default]
    Abort,
    /// Count it, log it and keep receiving
    Skip,
}

/// Collector configuration
#[derive(Clone, Debug)]
pub struct CollectorConfig {
    pub bind_addr: SocketAddr,
    pub recv_buffer_size: usize,
    pub append_failure: AppendFailurePolicy,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9999)),
            recv_buffer_size: RECV_BUFFER_SIZE,
            append_failure: AppendFailurePolicy::Abort,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectorStats {
    pub received: u64,
    pub accepted: u64,
    pub discarded: u64,
    pub append_failures: u64,
    pub recv_errors: u64,
}

/// Outcome of handling one datagram
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Appended,
    Discarded,
    AppendSkipped,
}

/// The always-on receiver and logger of node reports
pub struct Collector<S> {
    transport: UdpTransport,
    sink: S,
    config: CollectorConfig,
    started: Instant,
    stats: CollectorStats,
}

impl Collector<FileLog> {
    /// Bind the socket and open the log. Either failure aborts startup.
    pub async fn open(config: CollectorConfig, log_path: &std::path::Path) -> DriftlineResult<Self> {
        let transport = UdpTransport::bind(config.bind_addr).await?;
        tracing::info!(addr = %transport.local_addr(), "listening for node reports");

        let sink = FileLog::open(log_path)?;
        tracing::info!(path = %log_path.display(), "appending to log");

        Ok(Collector::new(transport, sink, config))
    }
}

impl<S: RecordSink> Collector<S> {
    pub fn new(transport: UdpTransport, sink: S, config: CollectorConfig) -> Self {
        Collector {
            transport,
            sink,
            config,
            started: Instant::now(),
            stats: CollectorStats::default(),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Collector clock: seconds since this collector was created
    pub fn collector_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Decode one datagram and append it.
    ///
    /// Short datagrams are discarded, as are tags that would break the row
    /// format (blank, or holding a comma or control byte). An append failure is returned only
    /// under `AppendFailurePolicy::Abort`.
    pub fn handle_datagram(
        &mut self,
        payload: &[u8],
        from: SocketAddr,
        collector_time: f64,
    ) -> DriftlineResult<Disposition> {
        self.stats.received += 1;

        let packet = match MeasurementPacket::parse(payload) {
            Ok(packet) => packet,
            Err(e) => {
                self.stats.discarded += 1;
                tracing::debug!(%from, len = payload.len(), error = %e, "discarding datagram");
                return Ok(Disposition::Discarded);
            }
        };

        let node = packet.node.name();
        if !is_loggable_node(&node) {
            self.stats.discarded += 1;
            tracing::debug!(%from, tag = ?packet.node, "discarding datagram with unloggable node tag");
            return Ok(Disposition::Discarded);
        }

        let record = LogRecord {
            collector_time,
            node,
            device_time: packet.timestamp.as_secs_f64(),
            measurement: packet.measurement,
        };

        tracing::debug!(
            node = %record.node,
            %from,
            collector_time = record.collector_time,
            device_time = record.device_time,
            measurement = record.measurement,
            "report"
        );

        match self.append(&record) {
            Ok(()) => {
                self.stats.accepted += 1;
                Ok(Disposition::Appended)
            }
            Err(e) => {
                self.stats.append_failures += 1;
                tracing::error!(error = %e, node = %record.node, "append failed");
                match self.config.append_failure {
                    AppendFailurePolicy::Abort => Err(e),
                    AppendFailurePolicy::Skip => Ok(Disposition::AppendSkipped),
                }
            }
        }
    }

    /// Appends block on a durable flush. On a multi-threaded runtime the
    /// worker is handed off first so other tasks keep running; a
    /// current-thread runtime has nothing else to run between datagrams.
    fn append(&mut self, record: &LogRecord) -> DriftlineResult<()> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| self.sink.append(record))
            }
            _ => self.sink.append(record),
        }
    }

    /// Receive until cancelled.
    ///
    /// Without cancellation this never returns `Ok`. Receive errors are
    /// logged and the loop continues, backing off while they repeat.
    pub async fn run(&mut self, cancel: CancellationToken) -> DriftlineResult<()> {
        let mut buf = vec![0u8; self.config.recv_buffer_size.max(driftline_wire::PACKET_SIZE)];
        let mut consecutive_errors = 0u32;

        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                r = self.transport.recv_bytes_from(&mut buf) => r,
            };
            let collector_time = self.collector_time();

            match received {
                Ok((len, from)) => {
                    if consecutive_errors > 0 {
                        tracing::info!(after = consecutive_errors, "receive recovered");
                        consecutive_errors = 0;
                    }
                    self.handle_datagram(&buf[..len], from, collector_time)?;
                }
                Err(e) => {
                    self.stats.recv_errors += 1;
                    consecutive_errors = consecutive_errors.saturating_add(1);
                    if consecutive_errors == 1 || consecutive_errors % RECV_ERROR_LOG_EVERY == 0 {
                        tracing::warn!(error = %e, consecutive = consecutive_errors, "receive error");
                    }
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(recv_error_backoff(consecutive_errors)) => {}
                    }
                }
            }
        }

        tracing::info!(
            received = self.stats.received,
            accepted = self.stats.accepted,
            discarded = self.stats.discarded,
            recv_errors = self.stats.recv_errors,
            "collector stopped"
        );
        Ok(())
    }
}

/// Bind, open and run a collector until cancelled
pub async fn run_collector(
    config: CollectorConfig,
    log_path: &std::path::Path,
    cancel: CancellationToken,
) -> DriftlineResult<CollectorStats> {
    let mut collector = Collector::open(config, log_path).await?;
    collector.run(cancel).await?;
    Ok(collector.stats)
}

impl std::str::FromStr for AppendFailurePolicy {
    type Err = DriftlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(AppendFailurePolicy::Abort),
            "skip" => Ok(AppendFailurePolicy::Skip),
            other => Err(DriftlineError::Config(format!(
                "unknown append failure policy {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use driftline_core::{DeviceTicks, NodeTag};
    use driftline_journal::{parse_series, MemoryLog};

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn append(&mut self, _record: &LogRecord) -> DriftlineResult<()> {
            Err(DriftlineError::LogAppend("disk full".into()))
        }
    }

    async fn collector<S: RecordSink>(sink: S, policy: AppendFailurePolicy) -> Collector<S> {
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let config = CollectorConfig {
            bind_addr: transport.local_addr(),
            append_failure: policy,
            ..Default::default()
        };
        Collector::new(transport, sink, config)
    }

    fn from() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_short_then_valid_datagram() {
        let log = MemoryLog::new();
        let mut c = collector(log.clone(), AppendFailurePolicy::Abort).await;

        let short = [0u8; 8];
        let valid = MeasurementPacket::new(NodeTag::new("A"), DeviceTicks(1_500_000), 12.0).to_bytes();

        assert_eq!(c.handle_datagram(&short, from(), 1.0).unwrap(), Disposition::Discarded);
        assert_eq!(c.handle_datagram(&valid, from(), 2.0).unwrap(), Disposition::Appended);

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].node, "A");
        assert_eq!(records[0].collector_time, 2.0);
        assert_eq!(records[0].device_time, 1.5);
        assert_eq!(records[0].measurement, 12.0);
        assert_eq!(c.stats().discarded, 1);
        assert_eq!(c.stats().accepted, 1);
    }

    #[tokio::test]
    async fn test_unloggable_tags_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut c = collector(FileLog::open(&path).unwrap(), AppendFailurePolicy::Abort).await;

        for tag in [*b"X,9.9", *b"A\nB\0\0", *b"A\rB\0\0", [0u8; 5], *b"     "] {
            let packet = MeasurementPacket::new(NodeTag::from_bytes(tag), DeviceTicks(1_000_000), 3.0);
            assert_eq!(
                c.handle_datagram(&packet.to_bytes(), from(), 5.0).unwrap(),
                Disposition::Discarded
            );
        }
        let good = MeasurementPacket::new(NodeTag::new("A"), DeviceTicks(1_000_000), 3.0);
        assert_eq!(c.handle_datagram(&good.to_bytes(), from(), 6.0).unwrap(), Disposition::Appended);

        assert_eq!(c.stats().discarded, 5);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);

        let (series, read) = parse_series(std::io::Cursor::new(text)).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series["A"].samples[0].device_time, 1.0);
        assert_eq!(read.malformed, 0);
    }

    #[test]
    fn test_recv_error_backoff() {
        assert_eq!(recv_error_backoff(0), Duration::ZERO);
        assert_eq!(recv_error_backoff(1), Duration::from_millis(1));
        assert_eq!(recv_error_backoff(4), Duration::from_millis(8));
        assert_eq!(recv_error_backoff(11), MAX_RECV_BACKOFF);
        assert_eq!(recv_error_backoff(u32::MAX), MAX_RECV_BACKOFF);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_file_append_on_multi_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut c = collector(FileLog::open(&path).unwrap(), AppendFailurePolicy::Abort).await;
        let addr = c.local_addr();
        let cancel = CancellationToken::new();

        let stop = cancel.clone();
        let handle = tokio::spawn(async move {
            let result = c.run(stop).await;
            (c, result)
        });

        let sender = UdpTransport::bind_for(addr).await.unwrap();
        for i in 0..5u32 {
            let packet = MeasurementPacket::new(NodeTag::new("A"), DeviceTicks(i * 1000), 1.0);
            sender.send_bytes_to(&packet.to_bytes(), addr).await.unwrap();
        }

        for _ in 0..200 {
            if std::fs::read_to_string(&path).unwrap().lines().count() == 6 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();

        let (c, result) = handle.await.unwrap();
        result.unwrap();
        assert_eq!(c.stats().accepted, 5);
    }

    #[tokio::test]
    async fn test_append_failure_abort() {
        let mut c = collector(FailingSink, AppendFailurePolicy::Abort).await;
        let valid = MeasurementPacket::new(NodeTag::new("A"), DeviceTicks(1), 1.0).to_bytes();
        assert!(matches!(
            c.handle_datagram(&valid, from(), 1.0),
            Err(DriftlineError::LogAppend(_))
        ));
    }

    #[tokio::test]
    async fn test_append_failure_skip() {
        let mut c = collector(FailingSink, AppendFailurePolicy::Skip).await;
        let valid = MeasurementPacket::new(NodeTag::new("A"), DeviceTicks(1), 1.0).to_bytes();
        assert_eq!(
            c.handle_datagram(&valid, from(), 1.0).unwrap(),
            Disposition::AppendSkipped
        );
        assert_eq!(c.stats().append_failures, 1);
    }

    #[tokio::test]
    async fn test_run_over_socket() {
        let log = MemoryLog::new();
        let mut c = collector(log.clone(), AppendFailurePolicy::Abort).await;
        let addr = c.local_addr();
        let cancel = CancellationToken::new();

        let sender = UdpTransport::bind_for(addr).await.unwrap();
        let valid = MeasurementPacket::new(NodeTag::new("B"), DeviceTicks(7), 3.0).to_bytes();
        sender.send_bytes_to(&[1, 2, 3, 4, 5, 6, 7, 8], addr).await.unwrap();
        sender.send_bytes_to(&valid, addr).await.unwrap();

        let stop = cancel.clone();
        let handle = tokio::spawn(async move {
            let result = c.run(stop).await;
            (c, result)
        });

        for _ in 0..200 {
            if log.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();

        let (c, result) = handle.await.unwrap();
        result.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.records()[0].node, "B");
        assert_eq!(c.stats().received, 2);
    }

    #[tokio::test]
    async fn test_open_fails_on_bad_log_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = CollectorConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let result = Collector::open(config, &dir.path().join("no").join("log.csv")).await;
        assert!(matches!(result, Err(DriftlineError::LogOpen(_))));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Skip".parse::<AppendFailurePolicy>().unwrap(), AppendFailurePolicy::Skip);
        assert!("retry".parse::<AppendFailurePolicy>().is_err());
    }
}
