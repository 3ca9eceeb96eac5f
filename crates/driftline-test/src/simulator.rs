//! Clock Simulator - synthetic collector logs with known drift
//!
//! Simulates:
//! - Nodes whose clocks run fast or slow by a fixed ppm
//! - A fixed clock offset per node
//! - Non-negative, roughly Gaussian delivery delay
//! - The 32-bit microsecond device counter

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use driftline_core::DeviceTicks;
use driftline_journal::{LogRecord, NodeSeries, SeriesSet, SyncSample};

/// True clock relationship for one simulated node:
/// `collector = slope · device + intercept + delay`
#[derive(Clone, Debug)]
pub struct ClockModel {
    pub node: String,
    /// Rate error against the collector, ppm
    pub drift_ppm: f64,
    /// Collector time when the device counter read zero, seconds
    pub intercept: f64,
    /// Device counter at the first sample, µs
    pub start_us: u64,
}

impl ClockModel {
    pub fn new(node: &str, drift_ppm: f64, intercept: f64) -> Self {
        ClockModel {
            node: node.to_string(),
            drift_ppm,
            intercept,
            start_us: 0,
        }
    }

    pub fn starting_at(mut self, start_us: u64) -> Self {
        self.start_us = start_us;
        self
    }

    #[inline]
    pub fn slope(&self) -> f64 {
        1.0 + self.drift_ppm / 1_000_000.0
    }
}

/// Delivery delay model
#[derive(Clone, Copy, Debug)]
pub struct DelayModel {
    /// Mean one-way delay, seconds
    pub mean: f64,
    /// Standard deviation, seconds
    pub std_dev: f64,
}

impl DelayModel {
    pub fn none() -> Self {
        DelayModel {
            mean: 0.0,
            std_dev: 0.0,
        }
    }

    /// Quiet LAN: ~3 ms ± 0.1 ms
    pub fn lan() -> Self {
        DelayModel {
            mean: 0.003,
            std_dev: 0.0001,
        }
    }

    /// Box–Muller sample, clamped at zero
    pub fn sample(&self, rng: &mut StdRng) -> f64 {
        if self.std_dev == 0.0 {
            return self.mean.max(0.0);
        }
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
        (self.mean + z * self.std_dev).max(0.0)
    }
}

/// Generates collector logs for a set of simulated nodes
pub struct SyncSimulator {
    rng: StdRng,
    nodes: Vec<ClockModel>,
    delay: DelayModel,
    /// Device-time spacing between reports, seconds
    period: f64,
}

impl SyncSimulator {
    pub fn new(seed: u64, period: f64, delay: DelayModel) -> Self {
        SyncSimulator {
            rng: StdRng::seed_from_u64(seed),
            nodes: Vec::new(),
            delay,
            period,
        }
    }

    pub fn add_node(&mut self, model: ClockModel) -> &mut Self {
        self.nodes.push(model);
        self
    }

    /// `count` reports per node, merged in collector receipt order
    pub fn records(&mut self, count: usize, measurement: f32) -> Vec<LogRecord> {
        let mut records = Vec::with_capacity(count * self.nodes.len());

        for model in &self.nodes {
            let slope = model.slope();
            for k in 0..count {
                let us = model.start_us + (k as f64 * self.period * 1_000_000.0).round() as u64;
                // the collector follows the unwrapped counter
                let elapsed = us as f64 / 1_000_000.0;
                let device_time = DeviceTicks::from_micros(us).as_secs_f64();
                let delay = self.delay.sample(&mut self.rng);
                records.push(LogRecord {
                    collector_time: slope * elapsed + model.intercept + delay,
                    node: model.node.clone(),
                    device_time,
                    measurement,
                });
            }
        }

        records.sort_by(|a, b| a.collector_time.total_cmp(&b.collector_time));
        records
    }

    /// Same as `records`, grouped into series without a trip through text
    pub fn series(&mut self, count: usize) -> SeriesSet {
        let mut set = SeriesSet::new();
        for r in self.records(count, 0.0) {
            set.entry(r.node)
                .or_insert_with(NodeSeries::default)
                .push(SyncSample {
                    collector_time: r.collector_time,
                    device_time: r.device_time,
                });
        }
        set
    }
}
