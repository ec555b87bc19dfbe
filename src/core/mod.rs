//! Core orchestration abstractions: catalogs, registry, selection, harness.

pub mod error;
pub mod catalog;
pub mod registry;
pub mod artifacts;
pub mod selection;
pub mod runner;
pub mod audit;
pub mod engine;

pub use error::{AppResult, PipelineError};
pub use catalog::{StatusCatalog, StatusKind, StatusMessage, TaskCatalog, TaskName};
pub use registry::{ClaimOutcome, RegisterEntry, RegistryStore, Transient};
pub use artifacts::{ArtifactKey, ArtifactRecord, ArtifactStore, ArtifactWrite, UpsertOutcome};
pub use selection::{eligible_candidates, select_next, Candidate};
pub use runner::{StepOutcome, TaskRunner};
pub use audit::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, PostgresAuditSink,
};
pub use engine::{PipelineEngine, RemovalCounts, RunOutcome};
