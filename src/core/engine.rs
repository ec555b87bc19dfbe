//! The execution harness: select, claim, process, commit.
//!
//! [`PipelineEngine`] owns the shared store behind a `parking_lot::Mutex`
//! and drives the per-invocation state machine
//! `eligible -> claimed(processing) -> committed(success | failure)`.
//! Selection and the conditional claim happen under one lock acquisition;
//! domain logic runs with the lock released; the commit (artifact upserts
//! plus the status write) happens under a second single acquisition. The
//! lock is never held across an await point.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::core::selection;
use crate::core::{
    build_audit_event, ArtifactRecord, ArtifactStore, AuditAction, AuditEvent, AuditSink,
    ClaimOutcome, PipelineError, RegisterEntry, RegistryStore, StatusCatalog, StatusKind,
    StatusMessage, TaskCatalog, TaskName, TaskRunner, Transient,
};
use crate::util::clock::now_ms;

/// Outcome of a single `run_once` invocation.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// One entry was claimed, processed, and committed.
    Committed {
        /// Transient that was processed.
        transient: String,
        /// Task that ran.
        task: TaskName,
        /// Status committed to the entry.
        status: StatusMessage,
        /// Recorded wall-clock duration in seconds.
        duration_s: f64,
    },
    /// No eligible entry, or the claim race was lost.
    Idle,
}

/// Entry and artifact counts removed by a cascade removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalCounts {
    /// Register entries removed.
    pub entries: usize,
    /// Artifacts removed.
    pub artifacts: usize,
}

/// Orchestration engine generic over the store backend.
///
/// The engine is the only component that writes register statuses. Runners
/// stay pure policy + domain logic; catalogs are loaded once and never
/// mutated.
pub struct PipelineEngine<S> {
    store: Arc<Mutex<S>>,
    tasks: TaskCatalog,
    statuses: StatusCatalog,
    audit: Option<Arc<Mutex<Box<dyn AuditSink>>>>,
}

impl<S: fmt::Debug> fmt::Debug for PipelineEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineEngine")
            .field("store", &self.store)
            .field("tasks", &self.tasks)
            .field("statuses", &self.statuses)
            .field("audit", &self.audit.as_ref().map(|_| "dyn AuditSink"))
            .finish()
    }
}

impl<S> PipelineEngine<S> {
    /// Create an engine from a store and the startup catalogs.
    pub fn new(store: S, tasks: TaskCatalog, statuses: StatusCatalog) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            tasks,
            statuses,
            audit: None,
        }
    }

    /// Attach an audit sink.
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Arc::new(Mutex::new(audit)));
        self
    }

    /// The task catalog this engine was started with.
    pub fn tasks(&self) -> &TaskCatalog {
        &self.tasks
    }

    /// The status catalog this engine was started with.
    pub fn statuses(&self) -> &StatusCatalog {
        &self.statuses
    }

    /// Record an audit event (sync operation with parking_lot mutex).
    fn record_audit(&self, event: AuditEvent) {
        if let Some(audit_sink) = &self.audit {
            let mut sink = audit_sink.lock();
            sink.record(event);
        }
    }
}

impl<S> PipelineEngine<S>
where
    S: RegistryStore + ArtifactStore,
{
    /// Process one unit of work for `runner`.
    ///
    /// Returns [`RunOutcome::Idle`] when nothing is eligible or the claim
    /// race was lost. Domain failures are committed as the runner's failure
    /// status and then surfaced as [`PipelineError::Step`] so the invoker's
    /// monitoring sees them. Configuration errors (unknown task or status)
    /// and storage errors propagate without committing anything.
    pub async fn run_once<R>(&self, runner: &R) -> Result<RunOutcome, PipelineError>
    where
        R: TaskRunner + ?Sized,
    {
        let task = runner.task_name();
        self.tasks.ensure_known(&task)?;
        let input_status = runner.input_status();
        self.statuses.ensure_known(&input_status)?;
        let failure_status = runner.failure_status();
        self.statuses.ensure_known(&failure_status)?;
        let prerequisites = runner.prerequisites();
        for (prereq_task, required) in &prerequisites {
            self.tasks.ensure_known(prereq_task)?;
            self.statuses.ensure_known(required)?;
        }

        // Selection and claim share one lock acquisition so the chosen entry
        // cannot change in between. The conditional claim is still the only
        // way into `processing`: a store shared with another process may
        // have moved the entry since its snapshot was taken.
        let claimed = {
            let mut store = self.store.lock();
            let candidates =
                selection::eligible_candidates(&*store, &task, &input_status, &prerequisites)?;
            match selection::select_next(candidates) {
                None => None,
                Some(candidate) => {
                    match store.claim(&candidate.transient.name, &task, &input_status, now_ms())? {
                        ClaimOutcome::Claimed => Some(candidate),
                        ClaimOutcome::Lost => {
                            tracing::debug!(
                                "claim lost for {} / {}",
                                candidate.transient.name,
                                task
                            );
                            None
                        }
                    }
                }
            }
        };
        let candidate = match claimed {
            Some(c) => c,
            None => return Ok(RunOutcome::Idle),
        };

        let name = candidate.transient.name.clone();
        tracing::debug!("claimed {} for task {}", name, task);
        self.record_audit(build_audit_event(
            &name,
            task.clone(),
            AuditAction::Claimed,
            Some(StatusMessage::processing()),
            None,
        ));

        let started = Instant::now();
        let result = runner.process(&candidate.transient).await;
        let duration_s = started.elapsed().as_secs_f64();

        match result {
            Ok(outcome) => {
                if let Err(err) = self.statuses.ensure_known(&outcome.status) {
                    // The entry stays in `processing` for the sweep to
                    // recover; committing an uncataloged label would poison
                    // prerequisite matching.
                    tracing::error!(
                        "task {} reported unresolvable status `{}` for {}",
                        task,
                        outcome.status,
                        name
                    );
                    return Err(err);
                }
                {
                    let mut store = self.store.lock();
                    let commit_ms = now_ms();
                    for write in outcome.artifacts {
                        store.upsert_artifact(write, commit_ms)?;
                    }
                    store.set_status(&name, &task, &outcome.status, Some(duration_s), commit_ms)?;
                }
                tracing::info!(
                    "task {} committed `{}` for {} in {:.3}s",
                    task,
                    outcome.status,
                    name,
                    duration_s
                );
                self.record_audit(build_audit_event(
                    &name,
                    task.clone(),
                    AuditAction::Committed,
                    Some(outcome.status.clone()),
                    Some(duration_s),
                ));
                Ok(RunOutcome::Committed {
                    transient: name,
                    task,
                    status: outcome.status,
                    duration_s,
                })
            }
            Err(source) => {
                {
                    let mut store = self.store.lock();
                    store.set_status(&name, &task, &failure_status, Some(duration_s), now_ms())?;
                }
                tracing::warn!("task {} failed for {}: {:#}", task, name, source);
                self.record_audit(build_audit_event(
                    &name,
                    task.clone(),
                    AuditAction::Failed,
                    Some(failure_status),
                    Some(duration_s),
                ));
                Err(PipelineError::Step {
                    task: task.to_string(),
                    transient: name,
                    source,
                })
            }
        }
    }

    /// Register a newly ingested transient: insert the entity and create one
    /// entry per cataloged task at `not processed`. Idempotent; existing
    /// entries are left untouched. Returns the number of entries created.
    pub fn initialize_register(&self, transient: &Transient) -> Result<usize, PipelineError> {
        let mut store = self.store.lock();
        let ts = now_ms();
        store.put_transient(transient.clone())?;
        let mut created = 0;
        for task in self.tasks.iter() {
            if store.entry(&transient.name, task)?.is_none() {
                store.insert_entry(RegisterEntry::new(
                    &transient.name,
                    task.clone(),
                    StatusMessage::not_processed(),
                    ts,
                ))?;
                created += 1;
            }
        }
        drop(store);
        tracing::info!(
            "initialized register for {} ({} entries created)",
            transient.name,
            created
        );
        Ok(created)
    }

    /// Re-ingest path: like [`PipelineEngine::initialize_register`] but every
    /// entry ends at `status` with its duration cleared. Used when archival
    /// uploads arrive already enriched. Returns the number of entries
    /// touched.
    pub fn initialize_register_with_status(
        &self,
        transient: &Transient,
        status: &StatusMessage,
    ) -> Result<usize, PipelineError> {
        self.statuses.ensure_known(status)?;
        let mut store = self.store.lock();
        let ts = now_ms();
        store.put_transient(transient.clone())?;
        let mut touched = 0;
        for task in self.tasks.iter() {
            if store.entry(&transient.name, task)?.is_some() {
                store.set_status(&transient.name, task, status, None, ts)?;
            } else {
                store.insert_entry(RegisterEntry::new(
                    &transient.name,
                    task.clone(),
                    status.clone(),
                    ts,
                ))?;
            }
            touched += 1;
        }
        drop(store);
        tracing::info!(
            "initialized register for {} at `{}` ({} entries)",
            transient.name,
            status,
            touched
        );
        Ok(touched)
    }

    /// Cascade removal of a transient: entity, register entries, and
    /// artifacts go together under one lock.
    pub fn remove_transient(&self, name: &str) -> Result<RemovalCounts, PipelineError> {
        let counts = {
            let mut store = self.store.lock();
            let entries = store.remove_transient(name)?;
            let artifacts = store.remove_artifacts(name)?;
            RemovalCounts { entries, artifacts }
        };
        tracing::info!(
            "removed {} ({} entries, {} artifacts)",
            name,
            counts.entries,
            counts.artifacts
        );
        Ok(counts)
    }

    /// True while any of the transient's entries is `processing`. Ingestion
    /// uses this to refuse overwriting a transient mid-flight.
    pub fn is_processing(&self, name: &str) -> Result<bool, PipelineError> {
        let store = self.store.lock();
        if store.transient(name)?.is_none() {
            return Err(PipelineError::UnknownTransient(name.into()));
        }
        let processing = StatusMessage::processing();
        Ok(store
            .entries_for_transient(name)?
            .iter()
            .any(|e| e.status == processing))
    }

    /// Reconciliation sweep: reset `processing` entries older than
    /// `older_than` back to `not processed`. Recovers entries orphaned by a
    /// crash mid-step. Returns the number of entries reset.
    pub fn release_stale_claims(&self, older_than: Duration) -> Result<usize, PipelineError> {
        let reset = {
            let mut store = self.store.lock();
            store.release_stale_claims(older_than.as_millis(), now_ms())?
        };
        for (transient, task) in &reset {
            self.record_audit(build_audit_event(
                transient,
                task.clone(),
                AuditAction::Requeued,
                Some(StatusMessage::not_processed()),
                None,
            ));
        }
        if !reset.is_empty() {
            tracing::warn!("released {} stale processing claims", reset.len());
        }
        Ok(reset.len())
    }

    /// Requeue entries of `task` parked in a `Retryable` status back to
    /// `not processed`. `Terminal` statuses are never touched. Returns the
    /// number of entries requeued.
    pub fn requeue_retryable(&self, task: &TaskName) -> Result<usize, PipelineError> {
        self.tasks.ensure_known(task)?;
        let retryable: Vec<StatusMessage> = self
            .statuses
            .iter()
            .filter(|(_, kind)| *kind == StatusKind::Retryable)
            .map(|(message, _)| message.clone())
            .collect();

        let mut requeued = Vec::new();
        {
            let mut store = self.store.lock();
            for status in &retryable {
                requeued.extend(store.requeue(task, status, now_ms())?);
            }
        }
        for transient in &requeued {
            self.record_audit(build_audit_event(
                transient,
                task.clone(),
                AuditAction::Requeued,
                Some(StatusMessage::not_processed()),
                None,
            ));
        }
        if !requeued.is_empty() {
            tracing::info!("requeued {} entries for task {}", requeued.len(), task);
        }
        Ok(requeued.len())
    }

    /// Fetch a transient by name.
    pub fn transient(&self, name: &str) -> Result<Option<Transient>, PipelineError> {
        self.store.lock().transient(name)
    }

    /// Names of all registered transients.
    pub fn transient_names(&self) -> Result<Vec<String>, PipelineError> {
        self.store.lock().transient_names()
    }

    /// All register entries for one transient.
    pub fn entries_for(&self, name: &str) -> Result<Vec<RegisterEntry>, PipelineError> {
        self.store.lock().entries_for_transient(name)
    }

    /// The entry for one (transient, task) pair.
    pub fn entry(
        &self,
        name: &str,
        task: &TaskName,
    ) -> Result<Option<RegisterEntry>, PipelineError> {
        self.store.lock().entry(name, task)
    }

    /// All artifacts for one transient.
    pub fn artifacts_for(&self, name: &str) -> Result<Vec<ArtifactRecord>, PipelineError> {
        self.store.lock().artifacts_for_transient(name)
    }

    /// Entry counts grouped by (task, status).
    pub fn status_counts(
        &self,
    ) -> Result<BTreeMap<(TaskName, StatusMessage), usize>, PipelineError> {
        self.store.lock().status_counts()
    }
}
