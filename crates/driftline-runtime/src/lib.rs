//! driftline Runtime - the two always-on loops
//!
//! - `Collector`: receive, decode, stamp and durably append node reports
//! - `SensorAgent`: sample, encode and send one report per period
//!
//! Both loops run until their `CancellationToken` is cancelled.

pub mod agent;
pub mod collector;
pub mod sampler;

pub use agent::*;
pub use collector::*;
pub use sampler::*;
