//! driftline Correlation Engine
//!
//! Offline batch pass over a collector log:
//! - Fit `collector ≈ a · device + b` per node by least squares
//! - Drift in ppm from the slope, apparent delay from the residuals
//! - Relative drift between a distinguished pair of nodes
//! - Text report and residual trace export

pub mod compare;
pub mod engine;
pub mod estimate;
pub mod fit;
pub mod report;
pub mod trace;

pub use compare::*;
pub use engine::*;
pub use estimate::*;
pub use fit::*;
pub use report::*;
pub use trace::*;
