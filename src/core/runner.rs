//! The polymorphic runner interface implemented by each pipeline step.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::core::{AppResult, ArtifactWrite, StatusMessage, TaskName, Transient};

/// Result of one domain-logic invocation: the status to commit plus any
/// artifact writes staged for the commit.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Status message to commit; must exist in the status catalog.
    pub status: StatusMessage,
    /// Artifact writes applied together with the status commit.
    pub artifacts: Vec<ArtifactWrite>,
}

impl StepOutcome {
    /// Outcome committing the given status with no artifacts.
    pub fn new(status: StatusMessage) -> Self {
        Self {
            status,
            artifacts: Vec::new(),
        }
    }

    /// Outcome committing the built-in `processed` status.
    pub fn processed() -> Self {
        Self::new(StatusMessage::processed())
    }

    /// Stage one artifact write.
    pub fn with_artifact(mut self, write: ArtifactWrite) -> Self {
        self.artifacts.push(write);
        self
    }

    /// Stage several artifact writes.
    pub fn with_artifacts(mut self, writes: impl IntoIterator<Item = ArtifactWrite>) -> Self {
        self.artifacts.extend(writes);
        self
    }
}

/// One pipeline step: task identity, scheduling policy, and domain logic.
///
/// The execution harness is generic over this trait and never branches on
/// the concrete runner. Implementations supply policy (input status,
/// prerequisites, failure status) and the `process` body; all claim/commit
/// mechanics live in the harness.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use transient_pipeline::core::{
///     AppResult, StatusMessage, StepOutcome, TaskName, TaskRunner, Transient,
/// };
///
/// struct ClassifyRunner;
///
/// #[async_trait]
/// impl TaskRunner for ClassifyRunner {
///     fn task_name(&self) -> TaskName {
///         TaskName::new("classify")
///     }
///
///     async fn process(&self, transient: &Transient) -> AppResult<StepOutcome> {
///         let _ = transient;
///         Ok(StepOutcome::processed())
///     }
/// }
/// ```
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// The task this runner processes. Must exist in the task catalog.
    fn task_name(&self) -> TaskName;

    /// Status the runner's own entry must hold to be picked up. Moving the
    /// entry out of this status at claim time is what prevents re-queueing.
    fn input_status(&self) -> StatusMessage {
        StatusMessage::not_processed()
    }

    /// Cross-task prerequisites: each named task's entry must hold the
    /// mapped status. The runner's own task does not belong here.
    fn prerequisites(&self) -> BTreeMap<TaskName, StatusMessage> {
        BTreeMap::new()
    }

    /// Status committed when `process` fails. Must exist in the status
    /// catalog.
    fn failure_status(&self) -> StatusMessage {
        StatusMessage::failed()
    }

    /// Run the domain logic for one transient. May perform arbitrary
    /// network/file I/O; the harness times the call and owns all registry
    /// writes.
    async fn process(&self, transient: &Transient) -> AppResult<StepOutcome>;
}
