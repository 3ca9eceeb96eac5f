//! driftline Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every driftline component:
//! - Node identifiers as carried on the wire (NodeTag)
//! - Device and collector time units
//! - Error enum and result alias

pub mod error;
pub mod id;
pub mod time;

pub use error::*;
pub use id::*;
pub use time::*;
