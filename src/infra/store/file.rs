//! File-backed registry and artifact store.
//!
//! A simplified durable backend: the full table state is serialized as one
//! JSON snapshot that is reloaded at open and rewritten after every
//! mutation. Suitable for single-node deployments where the registry is
//! small relative to the science data it orchestrates.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{
    ArtifactKey, ArtifactRecord, ArtifactStore, ArtifactWrite, ClaimOutcome, PipelineError,
    RegisterEntry, RegistryStore, StatusMessage, TaskName, Transient, UpsertOutcome,
};
use crate::infra::store::state::StoreState;

/// On-disk snapshot layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotDoc {
    transients: Vec<Transient>,
    entries: Vec<RegisterEntry>,
    artifacts: Vec<ArtifactRecord>,
}

impl SnapshotDoc {
    fn from_state(state: &StoreState) -> Self {
        Self {
            transients: state.transients.values().cloned().collect(),
            entries: state.entries.values().cloned().collect(),
            artifacts: state.artifacts.values().cloned().collect(),
        }
    }

    fn into_state(self) -> StoreState {
        let mut state = StoreState::new();
        for transient in self.transients {
            state.put_transient(transient);
        }
        for entry in self.entries {
            state
                .entries
                .insert((entry.transient.clone(), entry.task.clone()), entry);
        }
        for record in self.artifacts {
            state.artifacts.insert(record.key.clone(), record);
        }
        state
    }
}

/// File-backed store using a JSON snapshot for durability.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: StoreState,
}

impl FileStore {
    /// Open (or create) a store rooted at `dir`; the snapshot lives at
    /// `dir/registry.json`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let dir = dir.as_ref().to_path_buf();
        create_dir_all(&dir).map_err(|e| PipelineError::Backend(e.to_string()))?;
        let mut store = Self {
            path: dir.join("registry.json"),
            state: StoreState::new(),
        };
        store.load_from_disk()?;
        Ok(store)
    }

    fn load_from_disk(&mut self) -> Result<(), PipelineError> {
        if !self.path.exists() {
            return Ok(());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| PipelineError::Backend(e.to_string()))?;
        let doc: SnapshotDoc =
            serde_json::from_str(&raw).map_err(|e| PipelineError::Backend(e.to_string()))?;
        self.state = doc.into_state();
        Ok(())
    }

    fn persist(&self) -> Result<(), PipelineError> {
        let doc = SnapshotDoc::from_state(&self.state);
        let raw =
            serde_json::to_string(&doc).map_err(|e| PipelineError::Backend(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| PipelineError::Backend(e.to_string()))?;
        writeln!(file, "{raw}").map_err(|e| PipelineError::Backend(e.to_string()))
    }
}

impl RegistryStore for FileStore {
    fn put_transient(&mut self, transient: Transient) -> Result<(), PipelineError> {
        self.state.put_transient(transient);
        self.persist()
    }

    fn transient(&self, name: &str) -> Result<Option<Transient>, PipelineError> {
        Ok(self.state.transient(name))
    }

    fn transient_names(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.state.transient_names())
    }

    fn insert_entry(&mut self, entry: RegisterEntry) -> Result<(), PipelineError> {
        self.state.insert_entry(entry)?;
        self.persist()
    }

    fn entry(
        &self,
        transient: &str,
        task: &TaskName,
    ) -> Result<Option<RegisterEntry>, PipelineError> {
        Ok(self.state.entry(transient, task))
    }

    fn entries_for_transient(&self, transient: &str) -> Result<Vec<RegisterEntry>, PipelineError> {
        Ok(self.state.entries_for_transient(transient))
    }

    fn transients_with_status(
        &self,
        task: &TaskName,
        status: &StatusMessage,
    ) -> Result<BTreeSet<String>, PipelineError> {
        Ok(self.state.transients_with_status(task, status))
    }

    fn claim(
        &mut self,
        transient: &str,
        task: &TaskName,
        expected: &StatusMessage,
        now_ms: u128,
    ) -> Result<ClaimOutcome, PipelineError> {
        let outcome = self.state.claim(transient, task, expected, now_ms);
        if outcome == ClaimOutcome::Claimed {
            self.persist()?;
        }
        Ok(outcome)
    }

    fn set_status(
        &mut self,
        transient: &str,
        task: &TaskName,
        status: &StatusMessage,
        duration_s: Option<f64>,
        now_ms: u128,
    ) -> Result<(), PipelineError> {
        self.state
            .set_status(transient, task, status, duration_s, now_ms)?;
        self.persist()
    }

    fn remove_transient(&mut self, name: &str) -> Result<usize, PipelineError> {
        let removed = self.state.remove_transient(name)?;
        self.persist()?;
        Ok(removed)
    }

    fn release_stale_claims(
        &mut self,
        older_than_ms: u128,
        now_ms: u128,
    ) -> Result<Vec<(String, TaskName)>, PipelineError> {
        let reset = self.state.release_stale_claims(older_than_ms, now_ms);
        if !reset.is_empty() {
            self.persist()?;
        }
        Ok(reset)
    }

    fn requeue(
        &mut self,
        task: &TaskName,
        from: &StatusMessage,
        now_ms: u128,
    ) -> Result<Vec<String>, PipelineError> {
        let requeued = self.state.requeue(task, from, now_ms);
        if !requeued.is_empty() {
            self.persist()?;
        }
        Ok(requeued)
    }

    fn status_counts(
        &self,
    ) -> Result<BTreeMap<(TaskName, StatusMessage), usize>, PipelineError> {
        Ok(self.state.status_counts())
    }
}

impl ArtifactStore for FileStore {
    fn upsert_artifact(
        &mut self,
        write: ArtifactWrite,
        now_ms: u128,
    ) -> Result<UpsertOutcome, PipelineError> {
        let outcome = self.state.upsert_artifact(write, now_ms);
        self.persist()?;
        Ok(outcome)
    }

    fn artifact(&self, key: &ArtifactKey) -> Result<Option<ArtifactRecord>, PipelineError> {
        Ok(self.state.artifact(key))
    }

    fn artifacts_for_transient(
        &self,
        transient: &str,
    ) -> Result<Vec<ArtifactRecord>, PipelineError> {
        Ok(self.state.artifacts_for_transient(transient))
    }

    fn remove_artifacts(&mut self, transient: &str) -> Result<usize, PipelineError> {
        let removed = self.state.remove_artifacts(transient);
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }
}
