//! Error types for pipeline orchestration.

use thiserror::Error;

/// Errors produced by the registry, catalogs, and execution harness.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A task name was used that is not present in the task catalog.
    #[error("unknown task `{0}`: not in the task catalog")]
    UnknownTask(String),
    /// A status message was reported that is not present in the status
    /// catalog. Raised loudly: this is a deployment defect, not an
    /// entity-level failure.
    #[error("unknown status `{0}`: not in the status catalog")]
    UnknownStatus(String),
    /// A register entry already exists for this (transient, task) pair.
    #[error("duplicate register entry for `{transient}` / `{task}`")]
    DuplicateEntry {
        /// Transient name.
        transient: String,
        /// Task name.
        task: String,
    },
    /// No register entry exists for this (transient, task) pair.
    #[error("no register entry for `{transient}` / `{task}`")]
    MissingEntry {
        /// Transient name.
        transient: String,
        /// Task name.
        task: String,
    },
    /// The named transient is not present in the registry.
    #[error("unknown transient `{0}`")]
    UnknownTransient(String),
    /// Backend-specific storage failure with context.
    #[error("backend error: {0}")]
    Backend(String),
    /// A runner's domain logic failed for one transient. Committed as the
    /// runner's failure status before being surfaced.
    #[error("task `{task}` failed for `{transient}`: {source}")]
    Step {
        /// Task name.
        task: String,
        /// Transient name.
        transient: String,
        /// Underlying domain-logic error.
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// True for errors that indicate a misconfigured catalog or runner
    /// rather than a failure of the entity being processed. Schedules halt
    /// on these instead of retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnknownTask(_) | Self::UnknownStatus(_))
    }
}

/// Application-facing result using anyhow for domain-logic contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
