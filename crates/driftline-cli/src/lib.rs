//! driftline binaries - configuration, telemetry and shutdown handling
//! shared by the collector, agent and analysis commands

pub mod config;
pub mod shutdown;
pub mod telemetry;

pub use shutdown::cancel_on_shutdown;
pub use telemetry::init_telemetry;
