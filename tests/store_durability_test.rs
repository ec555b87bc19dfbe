//! Durability tests for the file-backed store.
//!
//! This test validates:
//! 1. Every mutation is snapshotted and survives a reopen
//! 2. Artifact upserts replace wholesale, leaving exactly one record
//! 3. Cascade removal persists across restarts
//! 4. A corrupt snapshot is reported as a backend error, not a panic
//! 5. The file-engine builder wires config, store, and catalogs together

use std::fs;
use std::path::PathBuf;

use serde_json::json;

use transient_pipeline::builders::build_file_engine;
use transient_pipeline::config::{PipelineConfig, StoreBackendConfig};
use transient_pipeline::core::{
    ArtifactKey, ArtifactStore, ArtifactWrite, ClaimOutcome, PipelineError, RegisterEntry,
    RegistryStore, StatusMessage, TaskName, Transient, UpsertOutcome,
};
use transient_pipeline::infra::FileStore;
use transient_pipeline::util::clock::now_ms;

fn scratch_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tp-{label}-{}", uuid::Uuid::new_v4()))
}

#[test]
fn test_mutations_survive_reopen() {
    let dir = scratch_dir("reopen");

    {
        let mut store = FileStore::open(&dir).unwrap();
        store
            .put_transient(Transient::new("2022abc", 1_000, 150.0, 2.0))
            .unwrap();
        store
            .insert_entry(RegisterEntry::new(
                "2022abc",
                TaskName::new("host_match"),
                StatusMessage::not_processed(),
                now_ms(),
            ))
            .unwrap();
        let claimed = store
            .claim(
                "2022abc",
                &TaskName::new("host_match"),
                &StatusMessage::not_processed(),
                now_ms(),
            )
            .unwrap();
        assert!(matches!(claimed, ClaimOutcome::Claimed));
        store
            .upsert_artifact(
                ArtifactWrite::new(
                    ArtifactKey::new("2022abc", "host"),
                    json!({"name": "NGC 5128"}),
                ),
                now_ms(),
            )
            .unwrap();
    }

    // Reopen from disk and verify everything came back
    let store = FileStore::open(&dir).unwrap();
    assert_eq!(store.transient_names().unwrap(), vec!["2022abc"]);
    let entry = store
        .entry("2022abc", &TaskName::new("host_match"))
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, StatusMessage::processing());
    let artifacts = store.artifacts_for_transient("2022abc").unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].payload["name"], "NGC 5128");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_upsert_replaces_wholesale_across_reopen() {
    let dir = scratch_dir("upsert");
    let key = ArtifactKey::new("2022abc", "cutout").with_discriminator("PanSTARRS_g");

    {
        let mut store = FileStore::open(&dir).unwrap();
        let first = store
            .upsert_artifact(
                ArtifactWrite::new(key.clone(), json!({"fits_uri": "v1.fits"})),
                now_ms(),
            )
            .unwrap();
        assert_eq!(first, UpsertOutcome::Created);
        let second = store
            .upsert_artifact(
                ArtifactWrite::new(key.clone(), json!({"fits_uri": "v2.fits"})),
                now_ms(),
            )
            .unwrap();
        assert_eq!(second, UpsertOutcome::Replaced);
    }

    let store = FileStore::open(&dir).unwrap();
    let artifacts = store.artifacts_for_transient("2022abc").unwrap();
    assert_eq!(artifacts.len(), 1); // no duplicate row with a stale payload
    assert_eq!(artifacts[0].payload["fits_uri"], "v2.fits");
    assert_eq!(store.artifact(&key).unwrap().unwrap().payload["fits_uri"], "v2.fits");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_cascade_removal_persists() {
    let dir = scratch_dir("removal");

    {
        let mut store = FileStore::open(&dir).unwrap();
        store
            .put_transient(Transient::new("2022abc", 1_000, 150.0, 2.0))
            .unwrap();
        for task in ["host_match", "cutout_download"] {
            store
                .insert_entry(RegisterEntry::new(
                    "2022abc",
                    TaskName::new(task),
                    StatusMessage::not_processed(),
                    now_ms(),
                ))
                .unwrap();
        }
        store
            .upsert_artifact(
                ArtifactWrite::new(ArtifactKey::new("2022abc", "host"), json!({})),
                now_ms(),
            )
            .unwrap();

        assert_eq!(store.remove_transient("2022abc").unwrap(), 2);
        assert_eq!(store.remove_artifacts("2022abc").unwrap(), 1);
    }

    let store = FileStore::open(&dir).unwrap();
    assert!(store.transient_names().unwrap().is_empty());
    assert!(store.entries_for_transient("2022abc").unwrap().is_empty());
    assert!(store.artifacts_for_transient("2022abc").unwrap().is_empty());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_corrupt_snapshot_is_a_backend_error() {
    let dir = scratch_dir("corrupt");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("registry.json"), "{ not json").unwrap();

    let err = FileStore::open(&dir).unwrap_err();
    assert!(matches!(err, PipelineError::Backend(_)));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_file_engine_builder_round_trip() {
    let dir = scratch_dir("builder");
    let cfg = PipelineConfig {
        store: StoreBackendConfig::File {
            path: dir.to_string_lossy().into_owned(),
        },
        ..PipelineConfig::default()
    };

    {
        let engine = build_file_engine(&cfg).unwrap();
        let created = engine
            .initialize_register(&Transient::new("2022abc", 1_000, 150.0, 2.0))
            .unwrap();
        assert_eq!(created, cfg.tasks.len());
    }

    // A second engine over the same directory sees the registered entries
    let engine = build_file_engine(&cfg).unwrap();
    assert_eq!(engine.transient_names().unwrap(), vec!["2022abc"]);
    assert_eq!(engine.entries_for("2022abc").unwrap().len(), cfg.tasks.len());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_file_engine_builder_rejects_other_backends() {
    let cfg = PipelineConfig::default(); // in-memory backend
    let err = build_file_engine(&cfg).unwrap_err();
    assert!(matches!(err, PipelineError::Backend(_)));
}
