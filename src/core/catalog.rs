//! Immutable task and status catalogs loaded once at startup.
//!
//! Every pipeline step and every status label a runner may report must exist
//! here. Lookups against an unknown name fail loudly so that a misconfigured
//! runner is caught at the first invocation instead of writing stray labels
//! into the registry.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::PipelineError;

/// Name of a pipeline step, referencing the task catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    /// Create a task name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status label from the status catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusMessage(String);

impl StatusMessage {
    /// Create a status message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Built-in initial status for freshly registered entries.
    pub fn not_processed() -> Self {
        Self("not processed".into())
    }

    /// Built-in reserved claim marker; only the harness writes it.
    pub fn processing() -> Self {
        Self("processing".into())
    }

    /// Built-in success status that downstream prerequisites match on.
    pub fn processed() -> Self {
        Self("processed".into())
    }

    /// Built-in generic failure status.
    pub fn failed() -> Self {
        Self("failed".into())
    }

    /// Message as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Disposition of a status for scheduling and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Waiting to be attempted; the usual input gate for runners.
    Pending,
    /// Claimed by an in-flight invocation; subject to the stale-claim sweep.
    InFlight,
    /// Step completed; downstream prerequisites may match on it.
    Success,
    /// Failed but eligible for requeueing back to `not processed`.
    Retryable,
    /// Parked permanently unless an operator intervenes.
    Terminal,
}

/// Closed set of pipeline step names.
#[derive(Debug, Clone)]
pub struct TaskCatalog {
    names: BTreeSet<TaskName>,
}

impl TaskCatalog {
    /// Build a catalog from step names. Duplicates collapse.
    pub fn from_names(names: impl IntoIterator<Item = TaskName>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    /// True if the task is cataloged.
    pub fn contains(&self, task: &TaskName) -> bool {
        self.names.contains(task)
    }

    /// Fail loudly if the task is not cataloged.
    pub fn ensure_known(&self, task: &TaskName) -> Result<(), PipelineError> {
        if self.contains(task) {
            Ok(())
        } else {
            Err(PipelineError::UnknownTask(task.to_string()))
        }
    }

    /// Iterate cataloged task names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskName> {
        self.names.iter()
    }

    /// Number of cataloged tasks.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if no tasks are cataloged.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Closed set of status labels with their retry dispositions.
///
/// The four built-ins (`not processed`, `processing`, `processed`, `failed`)
/// are always present; deployments extend the catalog with step-specific
/// outcome labels such as `no host redshift`.
#[derive(Debug, Clone)]
pub struct StatusCatalog {
    entries: BTreeMap<StatusMessage, StatusKind>,
}

impl StatusCatalog {
    /// Catalog holding only the built-in statuses.
    pub fn with_defaults() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(StatusMessage::not_processed(), StatusKind::Pending);
        entries.insert(StatusMessage::processing(), StatusKind::InFlight);
        entries.insert(StatusMessage::processed(), StatusKind::Success);
        entries.insert(StatusMessage::failed(), StatusKind::Retryable);
        Self { entries }
    }

    /// Extend with custom statuses. Later entries win on duplicate messages;
    /// configuration validation rejects attempts to redefine built-ins.
    pub fn extend(mut self, customs: impl IntoIterator<Item = (StatusMessage, StatusKind)>) -> Self {
        for (message, kind) in customs {
            self.entries.insert(message, kind);
        }
        self
    }

    /// True if the status is cataloged.
    pub fn contains(&self, status: &StatusMessage) -> bool {
        self.entries.contains_key(status)
    }

    /// Disposition of a cataloged status, or a loud configuration error.
    pub fn kind_of(&self, status: &StatusMessage) -> Result<StatusKind, PipelineError> {
        self.entries
            .get(status)
            .copied()
            .ok_or_else(|| PipelineError::UnknownStatus(status.to_string()))
    }

    /// Fail loudly if the status is not cataloged.
    pub fn ensure_known(&self, status: &StatusMessage) -> Result<(), PipelineError> {
        self.kind_of(status).map(|_| ())
    }

    /// Iterate cataloged statuses in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&StatusMessage, StatusKind)> {
        self.entries.iter().map(|(m, k)| (m, *k))
    }

    /// Number of cataloged statuses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the catalog is empty. Never the case for catalogs built
    /// through [`StatusCatalog::with_defaults`].
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
