//! driftline Wire Protocol - Binary measurement packet
//!
//! A node reports one measurement per datagram as a fixed 13-byte record:
//! - Bytes 0-4: Node tag (ASCII, NUL padded)
//! - Bytes 5-8: Device timestamp, µs (BE, u32, wrapping)
//! - Bytes 9-12: Measurement (BE, IEEE-754 f32)
//!
//! There is no checksum, sequence number or authentication.

pub mod packet;

pub use packet::*;
