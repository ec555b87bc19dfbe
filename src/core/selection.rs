//! Eligibility resolution and priority selection.
//!
//! A runner is eligible to process a transient when the transient's own
//! entry for the runner's task holds the runner's input status AND every
//! cross-task prerequisite (task, status) pair matches. Eligibility is pure
//! set algebra over the registry: seed with the input-status set, then
//! intersect once per prerequisite. Intersection is commutative, so the
//! iteration order of the prerequisite map never changes the result.

use std::collections::BTreeMap;

use crate::core::{
    PipelineError, RegisterEntry, RegistryStore, StatusMessage, TaskName, Transient,
};

/// An eligible unit of work: the transient plus its own-task entry.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The transient to process.
    pub transient: Transient,
    /// Its register entry for the runner's task.
    pub entry: RegisterEntry,
}

/// Compute the candidates currently eligible for a runner.
///
/// `input_status` gates the runner's own entry; `prerequisites` are the
/// cross-task constraints. An empty intersection is a valid outcome and
/// yields an empty candidate list.
pub fn eligible_candidates<S>(
    store: &S,
    task: &TaskName,
    input_status: &StatusMessage,
    prerequisites: &BTreeMap<TaskName, StatusMessage>,
) -> Result<Vec<Candidate>, PipelineError>
where
    S: RegistryStore + ?Sized,
{
    let mut survivors = store.transients_with_status(task, input_status)?;
    for (prereq_task, required) in prerequisites {
        if survivors.is_empty() {
            break;
        }
        let matching = store.transients_with_status(prereq_task, required)?;
        survivors.retain(|name| matching.contains(name));
    }

    let mut candidates = Vec::with_capacity(survivors.len());
    for name in survivors {
        // Entity or entry vanishing between queries means a concurrent
        // removal; the survivor is simply skipped.
        let transient = match store.transient(&name)? {
            Some(t) => t,
            None => continue,
        };
        let entry = match store.entry(&name, task)? {
            Some(e) => e,
            None => continue,
        };
        candidates.push(Candidate { transient, entry });
    }
    Ok(candidates)
}

/// Pick exactly one candidate: the smallest public timestamp wins, with ties
/// broken by ascending transient name. Returns `None` when there is no work.
pub fn select_next(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.into_iter().min_by(|a, b| {
        a.transient
            .public_timestamp_ms
            .cmp(&b.transient.public_timestamp_ms)
            .then_with(|| a.transient.name.cmp(&b.transient.name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::store::memory::InMemoryStore;
    use crate::core::RegisterEntry;

    fn task(name: &str) -> TaskName {
        TaskName::new(name)
    }

    fn seed(store: &mut InMemoryStore, name: &str, ts: u128, entries: &[(&str, &str)]) {
        store
            .put_transient(Transient::new(name, ts, 120.0, -30.0))
            .unwrap();
        for (t, s) in entries {
            store
                .insert_entry(RegisterEntry::new(
                    name,
                    task(t),
                    StatusMessage::new(*s),
                    ts,
                ))
                .unwrap();
        }
    }

    #[test]
    fn test_input_status_gates_own_entry() {
        let mut store = InMemoryStore::new();
        seed(&mut store, "2022aaa", 10, &[("photometry", "not processed")]);
        seed(&mut store, "2022bbb", 20, &[("photometry", "processed")]);

        let eligible = eligible_candidates(
            &store,
            &task("photometry"),
            &StatusMessage::not_processed(),
            &BTreeMap::new(),
        )
        .unwrap();

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].transient.name, "2022aaa");
    }

    #[test]
    fn test_cross_task_prerequisites_intersect() {
        let mut store = InMemoryStore::new();
        // Both gates open.
        seed(
            &mut store,
            "2022aaa",
            10,
            &[
                ("sed", "not processed"),
                ("photometry", "processed"),
                ("redshift", "processed"),
            ],
        );
        // Redshift gate closed.
        seed(
            &mut store,
            "2022bbb",
            20,
            &[
                ("sed", "not processed"),
                ("photometry", "processed"),
                ("redshift", "failed"),
            ],
        );
        // Own entry already done.
        seed(
            &mut store,
            "2022ccc",
            30,
            &[
                ("sed", "processed"),
                ("photometry", "processed"),
                ("redshift", "processed"),
            ],
        );

        let prereqs = BTreeMap::from([
            (task("photometry"), StatusMessage::processed()),
            (task("redshift"), StatusMessage::processed()),
        ]);
        let eligible = eligible_candidates(
            &store,
            &task("sed"),
            &StatusMessage::not_processed(),
            &prereqs,
        )
        .unwrap();

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].transient.name, "2022aaa");
    }

    #[test]
    fn test_empty_intersection_is_not_an_error() {
        let mut store = InMemoryStore::new();
        seed(&mut store, "2022aaa", 10, &[("cutout", "processed")]);

        let eligible = eligible_candidates(
            &store,
            &task("cutout"),
            &StatusMessage::not_processed(),
            &BTreeMap::new(),
        )
        .unwrap();
        assert!(eligible.is_empty());
        assert!(select_next(eligible).is_none());
    }

    #[test]
    fn test_selection_prefers_oldest_timestamp() {
        let mut store = InMemoryStore::new();
        seed(&mut store, "2022zzz", 100, &[("host", "not processed")]);
        seed(&mut store, "2022aaa", 500, &[("host", "not processed")]);

        let eligible = eligible_candidates(
            &store,
            &task("host"),
            &StatusMessage::not_processed(),
            &BTreeMap::new(),
        )
        .unwrap();
        let picked = select_next(eligible).unwrap();
        // Older announcement wins despite the later name.
        assert_eq!(picked.transient.name, "2022zzz");
    }

    #[test]
    fn test_selection_tiebreak_by_name() {
        let mut store = InMemoryStore::new();
        seed(&mut store, "2022bbb", 100, &[("host", "not processed")]);
        seed(&mut store, "2022aaa", 100, &[("host", "not processed")]);

        let eligible = eligible_candidates(
            &store,
            &task("host"),
            &StatusMessage::not_processed(),
            &BTreeMap::new(),
        )
        .unwrap();
        let picked = select_next(eligible).unwrap();
        assert_eq!(picked.transient.name, "2022aaa");
    }
}
