//! Sensor agent - periodic sample, encode, send
//!
//! Each cycle reads the node clock, asks the sampler for a value and, if one
//! is present, sends a single datagram to the collector. Sends are fire and
//! forget. Running out of network buffers is expected on small devices: the
//! agent counts it, runs its reclaim hook and moves on. No error ends the
//! loop; only cancellation does.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use driftline_core::{DriftlineResult, NodeTag};
use driftline_transport::{SendFailure, UdpTransport};
use driftline_wire::{MeasurementPacket, PacketBuf, PACKET_SIZE};

use crate::{DeviceClock, MonotonicClock, Sampler};

/// Outbound datagram path
#[allow(async_fn_in_trait)]
pub trait DatagramSink {
    async fn send_datagram(&self, payload: &[u8]) -> Result<(), SendFailure>;
}

/// UDP socket aimed at a fixed collector address
pub struct UdpSink {
    transport: UdpTransport,
    dest: SocketAddr,
}

impl UdpSink {
    pub async fn connect(dest: SocketAddr) -> DriftlineResult<Self> {
        let transport = UdpTransport::bind_for(dest).await?;
        Ok(UdpSink { transport, dest })
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }
}

impl DatagramSink for UdpSink {
    async fn send_datagram(&self, payload: &[u8]) -> Result<(), SendFailure> {
        self.transport.send_bytes_to(payload, self.dest).await
    }
}

/// Hook run after a resource-exhaustion send failure
pub trait Reclaim {
    fn reclaim(&mut self);

    /// Pause before the next cycle so the network stack can drain
    fn backoff(&self) -> Duration {
        Duration::ZERO
    }

    /// Called after a send succeeds
    fn recovered(&mut self) {}
}

impl<F: FnMut()> Reclaim for F {
    fn reclaim(&mut self) {
        self()
    }
}

/// Reclaim hook that does nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoReclaim;

impl Reclaim for NoReclaim {
    fn reclaim(&mut self) {}
}

/// Backs off after exhausted sends, doubling the pause on each consecutive
/// failure up to `max`. The agent owns no reclaimable memory of its own, so
/// the exhausted resource is the network stack's buffer pool and the only
/// lever is to stop feeding it for a moment.
#[derive(Clone, Copy, Debug)]
pub struct ExhaustionBackoff {
    base: Duration,
    max: Duration,
    consecutive: u32,
}

impl ExhaustionBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        ExhaustionBackoff {
            base,
            max: max.max(base),
            consecutive: 0,
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

impl Reclaim for ExhaustionBackoff {
    fn reclaim(&mut self) {
        self.consecutive = self.consecutive.saturating_add(1);
    }

    fn backoff(&self) -> Duration {
        if self.consecutive == 0 {
            return Duration::ZERO;
        }
        let shift = (self.consecutive - 1).min(16);
        self.base.saturating_mul(1 << shift).min(self.max)
    }

    fn recovered(&mut self) {
        self.consecutive = 0;
    }
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub node: NodeTag,
    /// Target cycle period (25 Hz by default)
    pub period: Duration,
    /// Log progress every this many sends or empty cycles
    pub progress_every: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            node: NodeTag::new("B"),
            period: Duration::from_millis(40),
            progress_every: 20,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentStats {
    pub cycles: u64,
    pub sent: u64,
    pub no_value: u64,
    /// Transient resource-exhaustion send failures
    pub exhausted: u64,
    pub send_errors: u64,
}

/// Result of a single cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    NoValue,
    Sent,
    Exhausted,
    Failed,
}

/// One node's sampling loop
pub struct SensorAgent<S, T> {
    config: AgentConfig,
    sampler: S,
    sink: T,
    clock: Box<dyn DeviceClock + Send>,
    reclaim: Box<dyn Reclaim + Send>,
    buf: PacketBuf,
    stats: AgentStats,
}

impl<S: Sampler, T: DatagramSink> SensorAgent<S, T> {
    pub fn new(config: AgentConfig, sampler: S, sink: T) -> Self {
        SensorAgent {
            config,
            sampler,
            sink,
            clock: Box::new(MonotonicClock::new()),
            reclaim: Box::new(NoReclaim),
            buf: [0u8; PACKET_SIZE],
            stats: AgentStats::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl DeviceClock + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_reclaim(mut self, reclaim: impl Reclaim + Send + 'static) -> Self {
        self.reclaim = Box::new(reclaim);
        self
    }

    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    pub fn sink(&self) -> &T {
        &self.sink
    }

    /// Run one sample/send cycle
    pub async fn cycle(&mut self) -> CycleOutcome {
        self.stats.cycles += 1;
        let every = self.config.progress_every.max(1);

        let timestamp = self.clock.now();
        let Some(value) = self.sampler.sample() else {
            self.stats.no_value += 1;
            if self.stats.no_value % every == 0 {
                tracing::debug!(node = %self.config.node, "no measurement");
            }
            return CycleOutcome::NoValue;
        };

        MeasurementPacket::new(self.config.node, timestamp, value).encode_into(&mut self.buf);

        match self.sink.send_datagram(&self.buf).await {
            Ok(()) => {
                self.stats.sent += 1;
                self.reclaim.recovered();
                if self.stats.sent % every == 0 {
                    tracing::debug!(
                        node = %self.config.node,
                        t_us = timestamp.as_micros(),
                        value,
                        "sent"
                    );
                }
                CycleOutcome::Sent
            }
            Err(SendFailure::ResourceExhausted(e)) => {
                self.stats.exhausted += 1;
                self.reclaim.reclaim();
                let pause = self.reclaim.backoff();
                tracing::trace!(
                    total = self.stats.exhausted,
                    backoff_ms = pause.as_millis() as u64,
                    error = %e,
                    "send exhausted resources"
                );
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
                CycleOutcome::Exhausted
            }
            Err(SendFailure::Other(e)) => {
                self.stats.send_errors += 1;
                tracing::warn!(node = %self.config.node, error = %e, "send error");
                CycleOutcome::Failed
            }
        }
    }

    /// Cycle at the configured period until cancelled.
    ///
    /// A slow cycle delays the next one rather than triggering a burst.
    pub async fn run(&mut self, cancel: CancellationToken) -> AgentStats {
        let mut ticker = tokio::time::interval(self.config.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            node = %self.config.node,
            period_ms = self.config.period.as_millis() as u64,
            "agent started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.cycle().await;
        }

        tracing::info!(
            node = %self.config.node,
            sent = self.stats.sent,
            exhausted = self.stats.exhausted,
            send_errors = self.stats.send_errors,
            "agent stopped"
        );
        self.stats.clone()
    }
}
