//! Time units for driftline
//!
//! Nodes count microseconds in a free-running 32-bit register that wraps
//! every 2^32 µs (about 71.6 minutes). The collector keeps its own clock in
//! seconds; the two are never synchronized, which is the point of the
//! correlation pass.

/// Microseconds per second
pub const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Device timestamp: microseconds since the node's arbitrary epoch, modulo 2^32
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct DeviceTicks(pub u32);

impl DeviceTicks {
    pub const ZERO: DeviceTicks = DeviceTicks(0);

    /// Reduce a wide microsecond count to the 32-bit wire register
    #[inline]
    pub fn from_micros(micros: u64) -> Self {
        DeviceTicks((micros & 0xFFFF_FFFF) as u32)
    }

    #[inline]
    pub fn as_micros(self) -> u32 {
        self.0
    }

    /// Seconds as written to the log
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_SEC
    }
}

impl From<u32> for DeviceTicks {
    fn from(us: u32) -> Self {
        DeviceTicks(us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_micros_wraps() {
        assert_eq!(DeviceTicks::from_micros(5), DeviceTicks(5));
        assert_eq!(DeviceTicks::from_micros((1u64 << 32) + 7), DeviceTicks(7));
    }

    #[test]
    fn test_as_secs() {
        assert_eq!(DeviceTicks(2_500_000).as_secs_f64(), 2.5);
    }
}
