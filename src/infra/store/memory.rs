//! In-memory registry and artifact store.
//!
//! The reference backend: development, tests, and single-process deployments
//! that do not need durability.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{
    ArtifactKey, ArtifactRecord, ArtifactStore, ArtifactWrite, ClaimOutcome, PipelineError,
    RegisterEntry, RegistryStore, StatusMessage, TaskName, Transient, UpsertOutcome,
};
use crate::infra::store::state::StoreState;

/// In-memory store backed by BTree tables.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: StoreState,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for InMemoryStore {
    fn put_transient(&mut self, transient: Transient) -> Result<(), PipelineError> {
        self.state.put_transient(transient);
        Ok(())
    }

    fn transient(&self, name: &str) -> Result<Option<Transient>, PipelineError> {
        Ok(self.state.transient(name))
    }

    fn transient_names(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.state.transient_names())
    }

    fn insert_entry(&mut self, entry: RegisterEntry) -> Result<(), PipelineError> {
        self.state.insert_entry(entry)
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
        Ok(self.state.claim(transient, task, expected, now_ms))
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
            .set_status(transient, task, status, duration_s, now_ms)
    }

    fn remove_transient(&mut self, name: &str) -> Result<usize, PipelineError> {
        self.state.remove_transient(name)
    }

    fn release_stale_claims(
        &mut self,
        older_than_ms: u128,
        now_ms: u128,
    ) -> Result<Vec<(String, TaskName)>, PipelineError> {
        Ok(self.state.release_stale_claims(older_than_ms, now_ms))
    }

    fn requeue(
        &mut self,
        task: &TaskName,
        from: &StatusMessage,
        now_ms: u128,
    ) -> Result<Vec<String>, PipelineError> {
        Ok(self.state.requeue(task, from, now_ms))
    }

    fn status_counts(
        &self,
    ) -> Result<BTreeMap<(TaskName, StatusMessage), usize>, PipelineError> {
        Ok(self.state.status_counts())
    }
}

impl ArtifactStore for InMemoryStore {
    fn upsert_artifact(
        &mut self,
        write: ArtifactWrite,
        now_ms: u128,
    ) -> Result<UpsertOutcome, PipelineError> {
        Ok(self.state.upsert_artifact(write, now_ms))
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
        Ok(self.state.remove_artifacts(transient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str) -> TaskName {
        TaskName::new(name)
    }

    fn seeded() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store
            .put_transient(Transient::new("2022abc", 1_000, 150.0, 20.0))
            .unwrap();
        store
            .insert_entry(RegisterEntry::new(
                "2022abc",
                task("host_match"),
                StatusMessage::not_processed(),
                1_000,
            ))
            .unwrap();
        store
    }

    #[test]
    fn test_claim_succeeds_on_expected_status() {
        let mut store = seeded();
        let outcome = store
            .claim(
                "2022abc",
                &task("host_match"),
                &StatusMessage::not_processed(),
                2_000,
            )
            .unwrap();
        assert_eq!(outcome, ClaimOutcome::Claimed);

        let entry = store.entry("2022abc", &task("host_match")).unwrap().unwrap();
        assert_eq!(entry.status, StatusMessage::processing());
        assert_eq!(entry.last_modified_ms, 2_000);
    }

    #[test]
    fn test_claim_lost_when_status_moved() {
        let mut store = seeded();
        store
            .claim(
                "2022abc",
                &task("host_match"),
                &StatusMessage::not_processed(),
                2_000,
            )
            .unwrap();

        // Second claimant expected `not processed` but the entry is now
        // `processing`.
        let outcome = store
            .claim(
                "2022abc",
                &task("host_match"),
                &StatusMessage::not_processed(),
                2_001,
            )
            .unwrap();
        assert_eq!(outcome, ClaimOutcome::Lost);
    }

    #[test]
    fn test_claim_lost_on_missing_entry() {
        let mut store = seeded();
        let outcome = store
            .claim(
                "2022zzz",
                &task("host_match"),
                &StatusMessage::not_processed(),
                2_000,
            )
            .unwrap();
        assert_eq!(outcome, ClaimOutcome::Lost);
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let mut store = seeded();
        let err = store
            .insert_entry(RegisterEntry::new(
                "2022abc",
                task("host_match"),
                StatusMessage::not_processed(),
                1_500,
            ))
            .unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateEntry { .. }));
    }

    #[test]
    fn test_set_status_replaces_duration() {
        let mut store = seeded();
        store
            .set_status(
                "2022abc",
                &task("host_match"),
                &StatusMessage::processed(),
                Some(1.25),
                3_000,
            )
            .unwrap();
        let entry = store.entry("2022abc", &task("host_match")).unwrap().unwrap();
        assert_eq!(entry.status, StatusMessage::processed());
        assert_eq!(entry.last_processing_time_s, Some(1.25));

        // A later write with None clears it.
        store
            .set_status(
                "2022abc",
                &task("host_match"),
                &StatusMessage::not_processed(),
                None,
                4_000,
            )
            .unwrap();
        let entry = store.entry("2022abc", &task("host_match")).unwrap().unwrap();
        assert_eq!(entry.last_processing_time_s, None);
    }

    #[test]
    fn test_set_status_missing_entry_errors() {
        let mut store = seeded();
        let err = store
            .set_status(
                "2022abc",
                &task("sed_fitting"),
                &StatusMessage::processed(),
                None,
                3_000,
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingEntry { .. }));
    }

    #[test]
    fn test_upsert_replaces_wholesale() {
        let mut store = InMemoryStore::new();
        let key = ArtifactKey::new("2022abc", "aperture").with_discriminator("sdss_g");

        let first = store
            .upsert_artifact(
                ArtifactWrite::new(key.clone(), serde_json::json!({"semi_major_arcsec": 2.0})),
                1_000,
            )
            .unwrap();
        assert_eq!(first, UpsertOutcome::Created);

        let second = store
            .upsert_artifact(
                ArtifactWrite::new(key.clone(), serde_json::json!({"semi_major_arcsec": 3.5})),
                2_000,
            )
            .unwrap();
        assert_eq!(second, UpsertOutcome::Replaced);

        // Exactly one record, holding the latest payload.
        let records = store.artifacts_for_transient("2022abc").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload["semi_major_arcsec"], 3.5);
        assert_eq!(records[0].updated_at_ms, 2_000);
    }

    #[test]
    fn test_remove_transient_cascades_entries() {
        let mut store = seeded();
        store
            .insert_entry(RegisterEntry::new(
                "2022abc",
                task("cutout_download"),
                StatusMessage::not_processed(),
                1_000,
            ))
            .unwrap();
        store
            .upsert_artifact(
                ArtifactWrite::new(ArtifactKey::new("2022abc", "host"), serde_json::json!({})),
                1_000,
            )
            .unwrap();

        let removed = store.remove_transient("2022abc").unwrap();
        assert_eq!(removed, 2);
        assert!(store.transient("2022abc").unwrap().is_none());
        assert!(store.entries_for_transient("2022abc").unwrap().is_empty());

        // Artifacts are a separate table; the engine removes them through
        // the artifact trait in the same lock scope.
        assert_eq!(store.remove_artifacts("2022abc").unwrap(), 1);

        let err = store.remove_transient("2022abc").unwrap_err();
        assert!(matches!(err, PipelineError::UnknownTransient(_)));
    }

    #[test]
    fn test_release_stale_claims_honors_threshold() {
        let mut store = seeded();
        store
            .insert_entry(RegisterEntry::new(
                "2022abc",
                task("cutout_download"),
                StatusMessage::not_processed(),
                1_000,
            ))
            .unwrap();
        // One old claim, one fresh claim.
        store
            .claim(
                "2022abc",
                &task("host_match"),
                &StatusMessage::not_processed(),
                1_000,
            )
            .unwrap();
        store
            .claim(
                "2022abc",
                &task("cutout_download"),
                &StatusMessage::not_processed(),
                9_500,
            )
            .unwrap();

        let reset = store.release_stale_claims(5_000, 10_000).unwrap();
        assert_eq!(reset, vec![("2022abc".to_string(), task("host_match"))]);

        let old = store.entry("2022abc", &task("host_match")).unwrap().unwrap();
        assert_eq!(old.status, StatusMessage::not_processed());
        let fresh = store
            .entry("2022abc", &task("cutout_download"))
            .unwrap()
            .unwrap();
        assert_eq!(fresh.status, StatusMessage::processing());
    }

    #[test]
    fn test_requeue_filters_task_and_status() {
        let mut store = seeded();
        store
            .put_transient(Transient::new("2022def", 2_000, 10.0, 5.0))
            .unwrap();
        store
            .insert_entry(RegisterEntry::new(
                "2022def",
                task("host_match"),
                StatusMessage::failed(),
                2_000,
            ))
            .unwrap();
        store
            .insert_entry(RegisterEntry::new(
                "2022def",
                task("cutout_download"),
                StatusMessage::failed(),
                2_000,
            ))
            .unwrap();

        let requeued = store
            .requeue(&task("host_match"), &StatusMessage::failed(), 3_000)
            .unwrap();
        assert_eq!(requeued, vec!["2022def".to_string()]);

        // The other task's failed entry is untouched.
        let other = store
            .entry("2022def", &task("cutout_download"))
            .unwrap()
            .unwrap();
        assert_eq!(other.status, StatusMessage::failed());
    }

    #[test]
    fn test_status_counts_groups_pairs() {
        let mut store = seeded();
        store
            .put_transient(Transient::new("2022def", 2_000, 10.0, 5.0))
            .unwrap();
        store
            .insert_entry(RegisterEntry::new(
                "2022def",
                task("host_match"),
                StatusMessage::not_processed(),
                2_000,
            ))
            .unwrap();

        let counts = store.status_counts().unwrap();
        assert_eq!(
            counts[&(task("host_match"), StatusMessage::not_processed())],
            2
        );
    }
}
