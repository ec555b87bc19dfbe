//! Configuration models for catalogs, stores, and scheduling cadence.

pub mod pipeline;

pub use pipeline::{PipelineConfig, StatusSpec, StoreBackendConfig, CONFIG_ENV_VAR};
