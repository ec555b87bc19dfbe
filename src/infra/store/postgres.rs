//! Postgres-backed registry and artifact store (schema and interface stubs).

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{
    ArtifactKey, ArtifactRecord, ArtifactStore, ArtifactWrite, ClaimOutcome, PipelineError,
    RegisterEntry, RegistryStore, StatusMessage, TaskName, Transient, UpsertOutcome,
};

/// Postgres store adapter placeholder.
#[derive(Debug, Default)]
pub struct PostgresStore;

impl PostgresStore {
    /// Create a new adapter.
    pub fn new() -> Self {
        Self
    }

    /// Migration statements for the registry, artifact, and entity tables.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r#"
CREATE TABLE IF NOT EXISTS tp_transients (
    name TEXT PRIMARY KEY,
    public_timestamp_ms NUMERIC NOT NULL,
    ra_deg DOUBLE PRECISION NOT NULL,
    dec_deg DOUBLE PRECISION NOT NULL,
    redshift DOUBLE PRECISION
);
CREATE INDEX IF NOT EXISTS idx_tp_transients_public_ts ON tp_transients (public_timestamp_ms, name);
"#,
            r#"
CREATE TABLE IF NOT EXISTS tp_task_register (
    transient TEXT NOT NULL REFERENCES tp_transients (name) ON DELETE CASCADE,
    task TEXT NOT NULL,
    status TEXT NOT NULL,
    last_modified_ms NUMERIC NOT NULL,
    last_processing_time_s DOUBLE PRECISION,
    PRIMARY KEY (transient, task)
);
CREATE INDEX IF NOT EXISTS idx_tp_task_register_task_status ON tp_task_register (task, status);
"#,
            r#"
CREATE TABLE IF NOT EXISTS tp_artifacts (
    transient TEXT NOT NULL REFERENCES tp_transients (name) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    discriminator TEXT,
    payload JSONB NOT NULL,
    updated_at_ms NUMERIC NOT NULL,
    PRIMARY KEY (transient, kind, discriminator)
);
"#,
        ]
    }

    /// The conditional claim as a single statement: zero rows updated means
    /// the claim was lost.
    pub fn claim_statement() -> &'static str {
        r#"
UPDATE tp_task_register
SET status = 'processing', last_modified_ms = $4
WHERE transient = $1 AND task = $2 AND status = $3
"#
    }
}

fn not_wired<T>() -> Result<T, PipelineError> {
    Err(PipelineError::Backend(
        "postgres store not wired to database client".into(),
    ))
}

impl RegistryStore for PostgresStore {
    fn put_transient(&mut self, _transient: Transient) -> Result<(), PipelineError> {
        not_wired()
    }

    fn transient(&self, _name: &str) -> Result<Option<Transient>, PipelineError> {
        not_wired()
    }

    fn transient_names(&self) -> Result<Vec<String>, PipelineError> {
        not_wired()
    }

    fn insert_entry(&mut self, _entry: RegisterEntry) -> Result<(), PipelineError> {
        not_wired()
    }

    fn entry(
        &self,
        _transient: &str,
        _task: &TaskName,
    ) -> Result<Option<RegisterEntry>, PipelineError> {
        not_wired()
    }

    fn entries_for_transient(&self, _transient: &str) -> Result<Vec<RegisterEntry>, PipelineError> {
        not_wired()
    }

    fn transients_with_status(
        &self,
        _task: &TaskName,
        _status: &StatusMessage,
    ) -> Result<BTreeSet<String>, PipelineError> {
        not_wired()
    }

    fn claim(
        &mut self,
        _transient: &str,
        _task: &TaskName,
        _expected: &StatusMessage,
        _now_ms: u128,
    ) -> Result<ClaimOutcome, PipelineError> {
        not_wired()
    }

    fn set_status(
        &mut self,
        _transient: &str,
        _task: &TaskName,
        _status: &StatusMessage,
        _duration_s: Option<f64>,
        _now_ms: u128,
    ) -> Result<(), PipelineError> {
        not_wired()
    }

    fn remove_transient(&mut self, _name: &str) -> Result<usize, PipelineError> {
        not_wired()
    }

    fn release_stale_claims(
        &mut self,
        _older_than_ms: u128,
        _now_ms: u128,
    ) -> Result<Vec<(String, TaskName)>, PipelineError> {
        not_wired()
    }

    fn requeue(
        &mut self,
        _task: &TaskName,
        _from: &StatusMessage,
        _now_ms: u128,
    ) -> Result<Vec<String>, PipelineError> {
        not_wired()
    }

    fn status_counts(
        &self,
    ) -> Result<BTreeMap<(TaskName, StatusMessage), usize>, PipelineError> {
        not_wired()
    }
}

impl ArtifactStore for PostgresStore {
    fn upsert_artifact(
        &mut self,
        _write: ArtifactWrite,
        _now_ms: u128,
    ) -> Result<UpsertOutcome, PipelineError> {
        not_wired()
    }

    fn artifact(&self, _key: &ArtifactKey) -> Result<Option<ArtifactRecord>, PipelineError> {
        not_wired()
    }

    fn artifacts_for_transient(
        &self,
        _transient: &str,
    ) -> Result<Vec<ArtifactRecord>, PipelineError> {
        not_wired()
    }

    fn remove_artifacts(&mut self, _transient: &str) -> Result<usize, PipelineError> {
        not_wired()
    }
}
