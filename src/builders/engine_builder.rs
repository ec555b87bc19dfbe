//! Builders to construct pipeline engines from configuration.

use crate::config::{PipelineConfig, StoreBackendConfig};
use crate::core::{ArtifactStore, InMemoryAuditSink, PipelineEngine, PipelineError, RegistryStore};
use crate::infra::{FileStore, InMemoryStore};

/// Build an engine from pipeline configuration using the provided store
/// factory. Validates the configuration, builds the catalogs, and attaches a
/// bounded in-memory audit sink.
pub fn build_engine<S, F>(
    cfg: &PipelineConfig,
    mut store_factory: F,
) -> Result<PipelineEngine<S>, PipelineError>
where
    S: RegistryStore + ArtifactStore,
    F: FnMut(&PipelineConfig) -> Result<S, PipelineError>,
{
    cfg.validate()
        .map_err(|e| PipelineError::Backend(format!("config invalid: {e}")))?;

    let store = store_factory(cfg)?;
    let engine = PipelineEngine::new(store, cfg.task_catalog(), cfg.status_catalog())
        .with_audit(Box::new(InMemoryAuditSink::new(cfg.audit_capacity)));
    Ok(engine)
}

/// Build an engine over an in-memory store, regardless of `cfg.store`.
pub fn build_memory_engine(
    cfg: &PipelineConfig,
) -> Result<PipelineEngine<InMemoryStore>, PipelineError> {
    build_engine(cfg, |_| Ok(InMemoryStore::new()))
}

/// Build an engine over the file store rooted at the configured directory.
pub fn build_file_engine(
    cfg: &PipelineConfig,
) -> Result<PipelineEngine<FileStore>, PipelineError> {
    build_engine(cfg, |cfg| match &cfg.store {
        StoreBackendConfig::File { path } => FileStore::open(path),
        _ => Err(PipelineError::Backend(
            "configured store backend is not `file`".into(),
        )),
    })
}
