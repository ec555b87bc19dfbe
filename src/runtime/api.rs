//! API-facing snapshot and health models.
//!
//! Read-only views over the engine, shaped for serialization. Dashboards and
//! ingestion services consume these; nothing here mutates the register.

use serde::{Deserialize, Serialize};

use crate::core::{
    ArtifactKey, ArtifactStore, PipelineEngine, PipelineError, RegisterEntry, RegistryStore,
    StatusMessage, TaskName,
};
use crate::util::clock::now_ms;

/// Entry count for one (task, status) cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusCount {
    /// Task name.
    pub task: TaskName,
    /// Status message.
    pub status: StatusMessage,
    /// Number of register entries.
    pub count: usize,
}

/// Point-in-time view of the whole register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSnapshot {
    /// Capture time (ms since epoch).
    pub captured_at_ms: u128,
    /// Number of registered transients.
    pub transient_count: usize,
    /// Entry counts grouped by task and status. Empty cells are omitted.
    pub counts: Vec<TaskStatusCount>,
}

/// Progress view for one transient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransientSummary {
    /// Transient name.
    pub transient: String,
    /// Register entries, one per cataloged task.
    pub entries: Vec<RegisterEntry>,
    /// Keys of the stored artifacts.
    pub artifacts: Vec<ArtifactKey>,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Registered transients.
    pub transients: usize,
    /// Entries currently `processing`.
    pub in_flight: usize,
}

/// Snapshot the register grouped by task and status.
pub fn register_snapshot<S>(engine: &PipelineEngine<S>) -> Result<RegisterSnapshot, PipelineError>
where
    S: RegistryStore + ArtifactStore,
{
    let counts = engine
        .status_counts()?
        .into_iter()
        .map(|((task, status), count)| TaskStatusCount {
            task,
            status,
            count,
        })
        .collect();
    Ok(RegisterSnapshot {
        captured_at_ms: now_ms(),
        transient_count: engine.transient_names()?.len(),
        counts,
    })
}

/// Summarize one transient's progress and stored artifacts.
pub fn transient_summary<S>(
    engine: &PipelineEngine<S>,
    name: &str,
) -> Result<TransientSummary, PipelineError>
where
    S: RegistryStore + ArtifactStore,
{
    if engine.transient(name)?.is_none() {
        return Err(PipelineError::UnknownTransient(name.into()));
    }
    let artifacts = engine
        .artifacts_for(name)?
        .into_iter()
        .map(|record| record.key)
        .collect();
    Ok(TransientSummary {
        transient: name.to_string(),
        entries: engine.entries_for(name)?,
        artifacts,
    })
}

/// Return a health payload.
pub fn health<S>(engine: &PipelineEngine<S>) -> Result<Health, PipelineError>
where
    S: RegistryStore + ArtifactStore,
{
    let processing = StatusMessage::processing();
    let in_flight = engine
        .status_counts()?
        .into_iter()
        .filter(|((_, status), _)| *status == processing)
        .map(|(_, count)| count)
        .sum();
    Ok(Health {
        ok: true,
        transients: engine.transient_names()?.len(),
        in_flight,
    })
}
