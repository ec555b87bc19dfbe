//! Shared utilities: wall-clock helpers and tracing setup.

pub mod clock;
pub mod telemetry;

pub use clock::*;
pub use telemetry::*;
