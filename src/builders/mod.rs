//! Builders to construct engines from configuration.

pub mod engine_builder;

pub use engine_builder::{build_engine, build_file_engine, build_memory_engine};
