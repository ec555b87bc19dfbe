//! Aperture photometry step.

use std::collections::BTreeMap;

use anyhow::bail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{
    AppResult, ArtifactKey, ArtifactWrite, StatusMessage, StepOutcome, TaskName, TaskRunner,
    Transient,
};

/// One flux measurement, persisted as a `photometry` artifact keyed by filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotometryPoint {
    /// Filter the flux was measured in.
    pub filter: String,
    /// Aperture flux in millijansky.
    pub flux_mjy: f64,
    /// Flux uncertainty in millijansky.
    pub flux_error_mjy: f64,
    /// AB magnitude, absent when the flux is non-positive.
    pub magnitude: Option<f64>,
    /// Magnitude uncertainty, absent when the flux is non-positive.
    pub magnitude_error: Option<f64>,
}

/// Flux-measurement collaborator.
#[async_trait]
pub trait Photometer: Send + Sync {
    /// Measure the aperture flux in each filter with both a cutout and a
    /// fitted aperture.
    async fn measure(&self, transient: &Transient) -> AppResult<Vec<PhotometryPoint>>;
}

/// Runner for the `aperture_photometry` task.
pub struct AperturePhotometryRunner<P> {
    photometer: P,
}

impl<P> AperturePhotometryRunner<P> {
    /// Wrap a measurement collaborator.
    pub fn new(photometer: P) -> Self {
        Self { photometer }
    }
}

#[async_trait]
impl<P> TaskRunner for AperturePhotometryRunner<P>
where
    P: Photometer,
{
    fn task_name(&self) -> TaskName {
        TaskName::new("aperture_photometry")
    }

    fn prerequisites(&self) -> BTreeMap<TaskName, StatusMessage> {
        BTreeMap::from([
            (
                TaskName::new("aperture_construction"),
                StatusMessage::processed(),
            ),
            (TaskName::new("cutout_download"), StatusMessage::processed()),
        ])
    }

    async fn process(&self, transient: &Transient) -> AppResult<StepOutcome> {
        let points = self.photometer.measure(transient).await?;
        if points.is_empty() {
            bail!("no filter yielded a flux measurement for {}", transient.name);
        }

        let mut outcome = StepOutcome::processed();
        for point in &points {
            let key =
                ArtifactKey::new(&transient.name, "photometry").with_discriminator(&point.filter);
            outcome = outcome.with_artifact(ArtifactWrite::new(key, serde_json::to_value(point)?));
        }
        Ok(outcome)
    }
}
