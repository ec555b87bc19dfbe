//! Scheduled trigger loops.
//!
//! Deployment drives one [`run_scheduled`] loop per runner, so each task type
//! advances on its own cadence against its own partition of the register, plus
//! one [`run_sweeper`] loop that recovers claims orphaned by a crash.

use std::sync::Arc;
use std::time::Duration;

use crate::core::{
    ArtifactStore, PipelineEngine, PipelineError, RegistryStore, TaskRunner,
};

/// Invoke `run_once` for `runner` on a fixed cadence until `shutdown` flips
/// to `true` or its sender is dropped.
///
/// Each tick processes at most one entry. Domain failures are already
/// committed by the harness, so they are logged and the schedule continues;
/// configuration and storage errors halt the loop and propagate.
pub async fn run_scheduled<S, R>(
    engine: Arc<PipelineEngine<S>>,
    runner: Arc<R>,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> Result<(), PipelineError>
where
    S: RegistryStore + ArtifactStore,
    R: TaskRunner + ?Sized,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.run_once(runner.as_ref()).await {
                    Ok(_) => {}
                    Err(err @ PipelineError::Step { .. }) => {
                        tracing::warn!("scheduled run failed: {err}");
                    }
                    Err(err) => return Err(err),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("trigger loop for {} stopping", runner.task_name());
                    return Ok(());
                }
            }
        }
    }
}

/// Release stale `processing` claims on a fixed cadence until `shutdown`
/// flips to `true` or its sender is dropped.
pub async fn run_sweeper<S>(
    engine: Arc<PipelineEngine<S>>,
    older_than: Duration,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> Result<(), PipelineError>
where
    S: RegistryStore + ArtifactStore,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.release_stale_claims(older_than)?;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("sweeper loop stopping");
                    return Ok(());
                }
            }
        }
    }
}
