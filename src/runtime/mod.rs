//! Trigger loops and the read-only API surface.

pub mod api;
#[cfg(feature = "tokio-runtime")]
pub mod trigger;

pub use api::{
    health, register_snapshot, transient_summary, Health, RegisterSnapshot, TaskStatusCount,
    TransientSummary,
};
#[cfg(feature = "tokio-runtime")]
pub use trigger::{run_scheduled, run_sweeper};
