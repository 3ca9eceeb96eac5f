//! driftline Test Harness - clock simulation and pipeline validation
//!
//! This crate provides:
//! - Seeded simulation of drifting node clocks with noisy delivery delay
//! - End-to-end scenarios over the real socket, log and correlation pass

pub mod integration;
pub mod simulator;

pub use integration::*;
pub use simulator::*;
