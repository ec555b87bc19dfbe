//! Registry data model and the durable store abstraction.
//!
//! The registry is the scheduler's single shared mutable resource: one row
//! per (transient, task) pair carrying the current status, the last-modified
//! timestamp, and the duration of the last completed attempt. Backends
//! implement [`RegistryStore`]; all status transitions flow through the
//! execution harness, which drives the conditional [`RegistryStore::claim`]
//! and [`RegistryStore::set_status`] operations under a single lock.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::{PipelineError, StatusMessage, TaskName};

/// An astronomical transient event tracked by the pipeline.
///
/// The scheduler reads only `name` and `public_timestamp_ms`; the remaining
/// fields are carried for the domain-logic collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transient {
    /// Unique survey designation, e.g. `2022abc`.
    pub name: String,
    /// Public announcement time in milliseconds since the Unix epoch. The
    /// scheduling priority key: older transients are processed first.
    pub public_timestamp_ms: u128,
    /// Right ascension in degrees.
    pub ra_deg: f64,
    /// Declination in degrees.
    pub dec_deg: f64,
    /// Spectroscopic redshift if known at ingest.
    pub redshift: Option<f64>,
}

impl Transient {
    /// Create a transient with its designation, announcement time, and sky
    /// position.
    pub fn new(
        name: impl Into<String>,
        public_timestamp_ms: u128,
        ra_deg: f64,
        dec_deg: f64,
    ) -> Self {
        Self {
            name: name.into(),
            public_timestamp_ms,
            ra_deg,
            dec_deg,
            redshift: None,
        }
    }

    /// Attach a known spectroscopic redshift.
    pub fn with_redshift(mut self, redshift: f64) -> Self {
        self.redshift = Some(redshift);
        self
    }
}

/// Scheduling record for one (transient, task) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterEntry {
    /// Name of the transient this entry belongs to.
    pub transient: String,
    /// Pipeline step this entry tracks.
    pub task: TaskName,
    /// Current status label.
    pub status: StatusMessage,
    /// Time of the last status change in milliseconds since the Unix epoch.
    pub last_modified_ms: u128,
    /// Wall-clock seconds of the last completed attempt, if any.
    pub last_processing_time_s: Option<f64>,
}

impl RegisterEntry {
    /// Create an entry with the given status and no recorded duration.
    pub fn new(
        transient: impl Into<String>,
        task: TaskName,
        status: StatusMessage,
        now_ms: u128,
    ) -> Self {
        Self {
            transient: transient.into(),
            task,
            status,
            last_modified_ms: now_ms,
            last_processing_time_s: None,
        }
    }
}

/// Result of a conditional claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The entry was transitioned to `processing` by this invocation.
    Claimed,
    /// The entry no longer held the expected status (another invocation got
    /// there first, or the entry is gone). Treated as no work, not an error.
    Lost,
}

/// Durable registry backend.
///
/// Implementations must make every method atomic with respect to each other;
/// callers serialize access through a mutex, so `&mut self` suffices. The
/// conditional `claim` is the sole mechanism for moving an entry into
/// `processing`.
pub trait RegistryStore {
    /// Insert or replace the entity record for a transient.
    fn put_transient(&mut self, transient: Transient) -> Result<(), PipelineError>;

    /// Fetch a transient by name.
    fn transient(&self, name: &str) -> Result<Option<Transient>, PipelineError>;

    /// Names of all registered transients, sorted.
    fn transient_names(&self) -> Result<Vec<String>, PipelineError>;

    /// Insert a new register entry. Fails with
    /// [`PipelineError::DuplicateEntry`] if the (transient, task) pair
    /// already has one.
    fn insert_entry(&mut self, entry: RegisterEntry) -> Result<(), PipelineError>;

    /// Fetch the entry for one (transient, task) pair.
    fn entry(&self, transient: &str, task: &TaskName)
        -> Result<Option<RegisterEntry>, PipelineError>;

    /// All entries for one transient, sorted by task name.
    fn entries_for_transient(&self, transient: &str) -> Result<Vec<RegisterEntry>, PipelineError>;

    /// Names of transients whose entry for `task` currently holds `status`.
    /// The building block for prerequisite intersection.
    fn transients_with_status(
        &self,
        task: &TaskName,
        status: &StatusMessage,
    ) -> Result<BTreeSet<String>, PipelineError>;

    /// Conditionally transition the entry to `processing`: succeeds only if
    /// the current status still equals `expected`. A missing entry counts as
    /// lost. Updates the last-modified timestamp on success; the stored
    /// duration is left untouched.
    fn claim(
        &mut self,
        transient: &str,
        task: &TaskName,
        expected: &StatusMessage,
        now_ms: u128,
    ) -> Result<ClaimOutcome, PipelineError>;

    /// Unconditionally set the entry's status and last-modified timestamp,
    /// replacing the stored duration with `duration_s` (`None` clears it).
    fn set_status(
        &mut self,
        transient: &str,
        task: &TaskName,
        status: &StatusMessage,
        duration_s: Option<f64>,
        now_ms: u128,
    ) -> Result<(), PipelineError>;

    /// Remove a transient and all of its register entries. Returns the
    /// number of entries removed. Fails with
    /// [`PipelineError::UnknownTransient`] if the transient is not present.
    fn remove_transient(&mut self, name: &str) -> Result<usize, PipelineError>;

    /// Reset `processing` entries whose last-modified timestamp is older
    /// than `older_than_ms` back to `not processed`, clearing their
    /// duration. Returns the (transient, task) pairs that were reset.
    fn release_stale_claims(
        &mut self,
        older_than_ms: u128,
        now_ms: u128,
    ) -> Result<Vec<(String, TaskName)>, PipelineError>;

    /// Reset every entry for `task` currently holding `from` back to
    /// `not processed`, clearing durations. Returns the names of the
    /// transients whose entries were reset.
    fn requeue(
        &mut self,
        task: &TaskName,
        from: &StatusMessage,
        now_ms: u128,
    ) -> Result<Vec<String>, PipelineError>;

    /// Entry counts grouped by (task, status), for dashboards and register
    /// snapshots.
    fn status_counts(&self)
        -> Result<BTreeMap<(TaskName, StatusMessage), usize>, PipelineError>;
}
