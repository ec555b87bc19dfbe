//! Randomized cross-check of eligibility and selection.
//!
//! Seeds registries with random statuses and verifies the engine claims
//! exactly the entry a brute-force filter over the same data would pick:
//! input gate plus every prerequisite, oldest public timestamp first, name
//! as the tiebreak.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rand::Rng;

use transient_pipeline::config::PipelineConfig;
use transient_pipeline::core::{
    AppResult, PipelineEngine, RegisterEntry, RegistryStore, RunOutcome, StatusMessage,
    StepOutcome, TaskName, TaskRunner, Transient,
};
use transient_pipeline::infra::InMemoryStore;
use transient_pipeline::util::clock::now_ms;

// Gated probe: needs both upstream tasks processed
struct ProbeRunner;

#[async_trait]
impl TaskRunner for ProbeRunner {
    fn task_name(&self) -> TaskName {
        TaskName::new("redshift_lookup")
    }

    fn prerequisites(&self) -> BTreeMap<TaskName, StatusMessage> {
        BTreeMap::from([
            (TaskName::new("host_match"), StatusMessage::processed()),
            (TaskName::new("cutout_download"), StatusMessage::processed()),
        ])
    }

    async fn process(&self, _transient: &Transient) -> AppResult<StepOutcome> {
        Ok(StepOutcome::processed())
    }
}

fn random_status(rng: &mut impl Rng) -> StatusMessage {
    match rng.random_range(0..4) {
        0 => StatusMessage::not_processed(),
        1 => StatusMessage::processing(),
        2 => StatusMessage::processed(),
        _ => StatusMessage::failed(),
    }
}

#[tokio::test]
async fn test_selection_matches_brute_force() {
    let tasks = ["host_match", "cutout_download", "redshift_lookup"];
    let mut rng = rand::rng();

    for _round in 0..50 {
        let mut store = InMemoryStore::new();
        let mut seeded: Vec<(String, u128, BTreeMap<&str, StatusMessage>)> = Vec::new();

        let count = rng.random_range(1..30);
        for i in 0..count {
            let name = format!("t{i:03}");
            // A small timestamp pool forces the name tiebreak regularly
            let ts = 1_000 + u128::from(rng.random_range(0..10u32));
            store
                .put_transient(Transient::new(&name, ts, 0.0, 0.0))
                .unwrap();
            let mut statuses = BTreeMap::new();
            for task in tasks {
                let status = random_status(&mut rng);
                store
                    .insert_entry(RegisterEntry::new(
                        &name,
                        TaskName::new(task),
                        status.clone(),
                        now_ms(),
                    ))
                    .unwrap();
                statuses.insert(task, status);
            }
            seeded.push((name, ts, statuses));
        }

        let expected = seeded
            .iter()
            .filter(|(_, _, statuses)| {
                statuses["redshift_lookup"] == StatusMessage::not_processed()
                    && statuses["host_match"] == StatusMessage::processed()
                    && statuses["cutout_download"] == StatusMessage::processed()
            })
            .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(name, _, _)| name.clone());

        let cfg = PipelineConfig::default();
        let engine = PipelineEngine::new(store, cfg.task_catalog(), cfg.status_catalog());
        match engine.run_once(&ProbeRunner).await.unwrap() {
            RunOutcome::Committed { transient, .. } => assert_eq!(Some(transient), expected),
            RunOutcome::Idle => assert_eq!(None, expected),
        }
    }
}

#[tokio::test]
async fn test_backlog_drains_in_timestamp_order() {
    let mut rng = rand::rng();
    let mut store = InMemoryStore::new();
    let mut expected: Vec<(u128, String)> = Vec::new();

    for i in 0..25 {
        let name = format!("t{i:03}");
        let ts = u128::from(rng.random_range(0..1_000u32));
        store
            .put_transient(Transient::new(&name, ts, 0.0, 0.0))
            .unwrap();
        // Everything is eligible: prereqs processed, probe task waiting
        for task in ["host_match", "cutout_download"] {
            store
                .insert_entry(RegisterEntry::new(
                    &name,
                    TaskName::new(task),
                    StatusMessage::processed(),
                    now_ms(),
                ))
                .unwrap();
        }
        store
            .insert_entry(RegisterEntry::new(
                &name,
                TaskName::new("redshift_lookup"),
                StatusMessage::not_processed(),
                now_ms(),
            ))
            .unwrap();
        expected.push((ts, name));
    }
    expected.sort();

    let cfg = PipelineConfig::default();
    let engine = PipelineEngine::new(store, cfg.task_catalog(), cfg.status_catalog());

    let mut drained = Vec::new();
    loop {
        match engine.run_once(&ProbeRunner).await.unwrap() {
            RunOutcome::Committed { transient, .. } => drained.push(transient),
            RunOutcome::Idle => break,
        }
    }

    let expected_names: Vec<String> = expected.into_iter().map(|(_, name)| name).collect();
    assert_eq!(drained, expected_names);
}
