//! Table state shared by the in-memory and file-backed stores.
//!
//! Both backends keep the same BTree tables; the file backend additionally
//! snapshots them to disk after every mutation. All operations here are
//! synchronous and infallible except where the contract defines an error
//! (duplicate insert, missing entry, unknown transient).

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{
    ArtifactKey, ArtifactRecord, ArtifactWrite, ClaimOutcome, PipelineError, RegisterEntry,
    StatusMessage, TaskName, Transient, UpsertOutcome,
};
use crate::util::clock::elapsed_ms;

/// BTree tables backing a registry plus artifact store.
#[derive(Debug, Default, Clone)]
pub struct StoreState {
    /// Entity records by name.
    pub transients: BTreeMap<String, Transient>,
    /// Register entries by (transient, task).
    pub entries: BTreeMap<(String, TaskName), RegisterEntry>,
    /// Artifacts by uniqueness key.
    pub artifacts: BTreeMap<ArtifactKey, ArtifactRecord>,
}

impl StoreState {
    /// Empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(transient: &str, task: &TaskName) -> (String, TaskName) {
        (transient.to_string(), task.clone())
    }

    /// Insert or replace an entity record.
    pub fn put_transient(&mut self, transient: Transient) {
        self.transients.insert(transient.name.clone(), transient);
    }

    /// Fetch an entity record.
    pub fn transient(&self, name: &str) -> Option<Transient> {
        self.transients.get(name).cloned()
    }

    /// Sorted names of all registered transients.
    pub fn transient_names(&self) -> Vec<String> {
        self.transients.keys().cloned().collect()
    }

    /// Insert a new register entry, failing on a duplicate pair.
    pub fn insert_entry(&mut self, entry: RegisterEntry) -> Result<(), PipelineError> {
        let key = (entry.transient.clone(), entry.task.clone());
        if self.entries.contains_key(&key) {
            return Err(PipelineError::DuplicateEntry {
                transient: entry.transient,
                task: entry.task.to_string(),
            });
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Fetch one register entry.
    pub fn entry(&self, transient: &str, task: &TaskName) -> Option<RegisterEntry> {
        self.entries.get(&Self::key(transient, task)).cloned()
    }

    /// All entries for one transient, in task order.
    pub fn entries_for_transient(&self, transient: &str) -> Vec<RegisterEntry> {
        self.entries
            .iter()
            .filter(|((name, _), _)| name == transient)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Names of transients whose entry for `task` holds `status`.
    pub fn transients_with_status(
        &self,
        task: &TaskName,
        status: &StatusMessage,
    ) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|((_, t), entry)| t == task && entry.status == *status)
            .map(|((name, _), _)| name.clone())
            .collect()
    }

    /// Conditional claim: transition to `processing` only if the entry still
    /// holds `expected`. A missing entry counts as lost.
    pub fn claim(
        &mut self,
        transient: &str,
        task: &TaskName,
        expected: &StatusMessage,
        now_ms: u128,
    ) -> ClaimOutcome {
        match self.entries.get_mut(&Self::key(transient, task)) {
            Some(entry) if entry.status == *expected => {
                entry.status = StatusMessage::processing();
                entry.last_modified_ms = now_ms;
                ClaimOutcome::Claimed
            }
            _ => ClaimOutcome::Lost,
        }
    }

    /// Unconditional status write, replacing the stored duration.
    pub fn set_status(
        &mut self,
        transient: &str,
        task: &TaskName,
        status: &StatusMessage,
        duration_s: Option<f64>,
        now_ms: u128,
    ) -> Result<(), PipelineError> {
        let entry = self
            .entries
            .get_mut(&Self::key(transient, task))
            .ok_or_else(|| PipelineError::MissingEntry {
                transient: transient.to_string(),
                task: task.to_string(),
            })?;
        entry.status = status.clone();
        entry.last_modified_ms = now_ms;
        entry.last_processing_time_s = duration_s;
        Ok(())
    }

    /// Remove a transient and its register entries. Returns the number of
    /// entries removed.
    pub fn remove_transient(&mut self, name: &str) -> Result<usize, PipelineError> {
        if self.transients.remove(name).is_none() {
            return Err(PipelineError::UnknownTransient(name.to_string()));
        }
        let before = self.entries.len();
        self.entries.retain(|(entry_name, _), _| entry_name != name);
        Ok(before - self.entries.len())
    }

    /// Reset stale `processing` entries to `not processed`. An entry is
    /// stale when at least `older_than_ms` has elapsed since its last
    /// modification.
    pub fn release_stale_claims(
        &mut self,
        older_than_ms: u128,
        now_ms: u128,
    ) -> Vec<(String, TaskName)> {
        let processing = StatusMessage::processing();
        let mut reset = Vec::new();
        for ((name, task), entry) in &mut self.entries {
            if entry.status == processing
                && elapsed_ms(entry.last_modified_ms, now_ms) >= older_than_ms
            {
                entry.status = StatusMessage::not_processed();
                entry.last_modified_ms = now_ms;
                entry.last_processing_time_s = None;
                reset.push((name.clone(), task.clone()));
            }
        }
        reset
    }

    /// Reset entries of `task` holding `from` back to `not processed`.
    /// Returns the affected transient names.
    pub fn requeue(&mut self, task: &TaskName, from: &StatusMessage, now_ms: u128) -> Vec<String> {
        let mut requeued = Vec::new();
        for ((name, entry_task), entry) in &mut self.entries {
            if entry_task == task && entry.status == *from {
                entry.status = StatusMessage::not_processed();
                entry.last_modified_ms = now_ms;
                entry.last_processing_time_s = None;
                requeued.push(name.clone());
            }
        }
        requeued
    }

    /// Entry counts grouped by (task, status).
    pub fn status_counts(&self) -> BTreeMap<(TaskName, StatusMessage), usize> {
        let mut counts = BTreeMap::new();
        for ((_, task), entry) in &self.entries {
            *counts
                .entry((task.clone(), entry.status.clone()))
                .or_insert(0) += 1;
        }
        counts
    }

    /// Delete-then-insert write of one artifact.
    pub fn upsert_artifact(&mut self, write: ArtifactWrite, now_ms: u128) -> UpsertOutcome {
        let record = ArtifactRecord {
            key: write.key.clone(),
            payload: write.payload,
            updated_at_ms: now_ms,
        };
        match self.artifacts.insert(write.key, record) {
            Some(_) => UpsertOutcome::Replaced,
            None => UpsertOutcome::Created,
        }
    }

    /// Fetch one artifact by key.
    pub fn artifact(&self, key: &ArtifactKey) -> Option<ArtifactRecord> {
        self.artifacts.get(key).cloned()
    }

    /// All artifacts for one transient, in key order.
    pub fn artifacts_for_transient(&self, transient: &str) -> Vec<ArtifactRecord> {
        self.artifacts
            .iter()
            .filter(|(key, _)| key.transient == transient)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Remove all artifacts for one transient. Returns the number removed.
    pub fn remove_artifacts(&mut self, transient: &str) -> usize {
        let before = self.artifacts.len();
        self.artifacts.retain(|key, _| key.transient != transient);
        before - self.artifacts.len()
    }
}
