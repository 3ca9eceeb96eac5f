//! Measurement sources and the node clock
//!
//! How a reading is physically obtained is not driftline's business; an
//! agent only asks for "the current value, if there is one".

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use driftline_core::DeviceTicks;

/// Source of one measurement per cycle
pub trait Sampler {
    /// Current reading, or `None` when nothing usable was measured
    fn sample(&mut self) -> Option<f32>;
}

impl<F: FnMut() -> Option<f32>> Sampler for F {
    fn sample(&mut self) -> Option<f32> {
        self()
    }
}

/// Rejects readings outside `[min, max]`
#[derive(Clone, Debug)]
pub struct RangeGate<S> {
    inner: S,
    min: f32,
    max: f32,
}

impl<S: Sampler> RangeGate<S> {
    pub fn new(inner: S, min: f32, max: f32) -> Self {
        RangeGate { inner, min, max }
    }
}

impl<S: Sampler> Sampler for RangeGate<S> {
    fn sample(&mut self) -> Option<f32> {
        self.inner
            .sample()
            .filter(|v| *v >= self.min && *v <= self.max)
    }
}

/// Bounded random walk standing in for a physical sensor.
///
/// The walk reflects off `[min, max]`. An excursion yields one reading just
/// outside the band without moving the walk, the way a real ranger
/// occasionally reports nonsense.
#[derive(Clone, Debug)]
pub struct SyntheticSampler {
    rng: StdRng,
    value: f32,
    step: f32,
    min: f32,
    max: f32,
    /// Probability that a cycle yields nothing
    dropout: f64,
    /// Probability that a cycle yields an out-of-band reading
    excursion: f64,
}

impl SyntheticSampler {
    /// Walk from `start` within `[min, max]`
    pub fn new(seed: u64, start: f32, step: f32, min: f32, max: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        SyntheticSampler {
            rng: StdRng::seed_from_u64(seed),
            value: start.clamp(min, max),
            step: step.abs(),
            min,
            max,
            dropout: 0.0,
            excursion: 0.0,
        }
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout.clamp(0.0, 1.0);
        self
    }

    pub fn with_excursions(mut self, excursion: f64) -> Self {
        self.excursion = excursion.clamp(0.0, 1.0);
        self
    }

    fn reflect(&self, v: f32) -> f32 {
        let v = if v > self.max {
            2.0 * self.max - v
        } else if v < self.min {
            2.0 * self.min - v
        } else {
            v
        };
        // steps wider than the band
        v.clamp(self.min, self.max)
    }
}

impl Sampler for SyntheticSampler {
    fn sample(&mut self) -> Option<f32> {
        if self.rng.gen_bool(self.dropout) {
            return None;
        }
        if self.rng.gen_bool(self.excursion) {
            let margin = self.step.max(1.0);
            return Some(if self.rng.gen_bool(0.5) {
                self.min - margin
            } else {
                self.max + margin
            });
        }
        let next = self.value + self.rng.gen_range(-self.step..=self.step);
        self.value = self.reflect(next);
        Some(self.value)
    }
}

/// Stand-in sensor the agent binary runs: a walk across `[min, max]` behind
/// a range gate, with 2% dropouts and 1% out-of-band readings.
pub fn synthetic_sensor(seed: u64, min: f32, max: f32) -> RangeGate<SyntheticSampler> {
    let midpoint = (min + max) / 2.0;
    let sampler = SyntheticSampler::new(seed, midpoint, 0.5, min, max)
        .with_dropout(0.02)
        .with_excursions(0.01);
    RangeGate::new(sampler, min, max)
}

/// The node's free-running microsecond counter
pub trait DeviceClock {
    fn now(&self) -> DeviceTicks;
}

/// Microseconds since construction, wrapped to 32 bits
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceClock for MonotonicClock {
    fn now(&self) -> DeviceTicks {
        DeviceTicks::from_micros(self.origin.elapsed().as_micros() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_gate() {
        let mut values = vec![1.0, 15.0, 31.0].into_iter();
        let mut gate = RangeGate::new(move || values.next(), 2.0, 30.0);

        assert_eq!(gate.sample(), None);
        assert_eq!(gate.sample(), Some(15.0));
        assert_eq!(gate.sample(), None);
        assert_eq!(gate.sample(), None);
    }

    #[test]
    fn test_synthetic_sampler_deterministic() {
        let mut a = SyntheticSampler::new(7, 10.0, 0.5, 2.0, 30.0).with_dropout(0.1);
        let mut b = SyntheticSampler::new(7, 10.0, 0.5, 2.0, 30.0).with_dropout(0.1);
        for _ in 0..50 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn test_synthetic_sampler_never_drops() {
        let mut s = SyntheticSampler::new(1, 10.0, 0.5, 2.0, 30.0);
        assert!((0..100).all(|_| s.sample().is_some()));
    }

    #[test]
    fn test_walk_stays_in_band() {
        let mut s = SyntheticSampler::new(3, 2.0, 0.5, 2.0, 30.0);
        for _ in 0..100_000 {
            let v = s.sample().unwrap();
            assert!((2.0..=30.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn test_step_wider_than_band() {
        let mut s = SyntheticSampler::new(5, 0.0, 10.0, -1.0, 1.0);
        assert!((0..1000).all(|_| s.sample().is_some_and(|v| (-1.0..=1.0).contains(&v))));
    }

    #[test]
    fn test_synthetic_sensor_keeps_reporting() {
        // two hours of cycles at 25 Hz
        let mut sensor = synthetic_sensor(0, 2.0, 30.0);
        let mut accepted_late = 0u32;
        for cycle in 0..200_000u32 {
            if sensor.sample().is_some() && cycle >= 150_000 {
                accepted_late += 1;
            }
        }
        // about 97% get through, the rest are dropouts and excursions
        assert!(accepted_late > 47_000, "{accepted_late}");
        assert!(accepted_late < 50_000, "{accepted_late}");
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let t1 = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let t2 = clock.now();
        assert!(t2.as_micros() > t1.as_micros());
    }
}
