//! driftline Transport Layer - UDP datagrams
//!
//! This crate provides:
//! - A bound UDP socket for the collector and for sending nodes
//! - Classification of send failures into transient exhaustion and the rest

pub mod udp;

pub use udp::*;
