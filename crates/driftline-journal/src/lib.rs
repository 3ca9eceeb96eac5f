//! driftline Journal - the persisted measurement log
//!
//! The log is a write-once, append-only text table:
//!
//! ```text
//! pico_time_s,node,esp_time_s,dist_cm
//! 12.345000,A,3.141593,17.250
//! ```
//!
//! One writer (the collector) appends; one reader (the correlation pass)
//! reads the whole file in a batch.

pub mod reader;
pub mod record;
pub mod sink;

pub use reader::*;
pub use record::*;
pub use sink::*;
