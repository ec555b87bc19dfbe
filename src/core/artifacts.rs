//! Derived-artifact records and the idempotent upsert abstraction.
//!
//! Runners persist what they compute (host records, cutout references,
//! apertures, photometry rows, SED posteriors) as artifacts keyed by
//! (transient, kind, discriminator). Writes go through a delete-then-insert
//! upsert so a rerun replaces its previous output wholesale; stale fields
//! from an earlier attempt can never survive.

use serde::{Deserialize, Serialize};

use crate::core::PipelineError;

/// Natural uniqueness key for a derived artifact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    /// Owning transient name.
    pub transient: String,
    /// Artifact kind, e.g. `host`, `cutout`, `aperture`, `photometry`.
    pub kind: String,
    /// Discriminating field within a kind, e.g. the photometric filter name.
    pub discriminator: Option<String>,
}

impl ArtifactKey {
    /// Key for a kind with at most one artifact per transient.
    pub fn new(transient: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            transient: transient.into(),
            kind: kind.into(),
            discriminator: None,
        }
    }

    /// Add a discriminator, e.g. a filter name for per-band artifacts.
    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = Some(discriminator.into());
        self
    }
}

/// A staged artifact write produced by a runner, applied by the harness at
/// commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactWrite {
    /// Uniqueness key the upsert matches on.
    pub key: ArtifactKey,
    /// Full replacement payload.
    pub payload: serde_json::Value,
}

impl ArtifactWrite {
    /// Stage a write of `payload` under `key`.
    pub fn new(key: ArtifactKey, payload: serde_json::Value) -> Self {
        Self { key, payload }
    }
}

/// A stored artifact as returned by queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Uniqueness key.
    pub key: ArtifactKey,
    /// Stored payload.
    pub payload: serde_json::Value,
    /// Time of the last upsert in milliseconds since the Unix epoch.
    pub updated_at_ms: u128,
}

/// Whether an upsert created a fresh record or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record matched the key; the write inserted a new one.
    Created,
    /// An existing record matched the key and was replaced wholesale.
    Replaced,
}

/// Artifact storage backend.
///
/// Usually implemented by the same type as
/// [`RegistryStore`](crate::core::RegistryStore) so the harness can apply
/// artifact writes and the status commit under one lock.
pub trait ArtifactStore {
    /// Delete any record matching the write's key, then insert the write.
    fn upsert_artifact(
        &mut self,
        write: ArtifactWrite,
        now_ms: u128,
    ) -> Result<UpsertOutcome, PipelineError>;

    /// Fetch the artifact stored under `key`.
    fn artifact(&self, key: &ArtifactKey) -> Result<Option<ArtifactRecord>, PipelineError>;

    /// All artifacts owned by one transient, sorted by key.
    fn artifacts_for_transient(
        &self,
        transient: &str,
    ) -> Result<Vec<ArtifactRecord>, PipelineError>;

    /// Remove every artifact owned by one transient. Returns the number
    /// removed.
    fn remove_artifacts(&mut self, transient: &str) -> Result<usize, PipelineError>;
}
