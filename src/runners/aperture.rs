//! Photometric aperture construction step.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{
    AppResult, ArtifactKey, ArtifactWrite, StatusMessage, StepOutcome, TaskName, TaskRunner,
    Transient,
};

/// Elliptical aperture persisted as an `aperture` artifact keyed by filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aperture {
    /// Filter the aperture applies to.
    pub filter: String,
    /// Aperture center right ascension in degrees.
    pub ra_deg: f64,
    /// Aperture center declination in degrees.
    pub dec_deg: f64,
    /// Semi-major axis in arcseconds.
    pub semi_major_arcsec: f64,
    /// Semi-minor axis in arcseconds.
    pub semi_minor_arcsec: f64,
    /// Position angle in degrees.
    pub orientation_deg: f64,
}

/// Aperture-fitting collaborator.
#[async_trait]
pub trait ApertureBuilder: Send + Sync {
    /// Fit apertures around the host in each filter with a usable cutout.
    /// An empty result means no image supported a fit.
    async fn build_apertures(&self, transient: &Transient) -> AppResult<Vec<Aperture>>;
}

/// Runner for the `aperture_construction` task.
///
/// Needs both a matched host to center on and downloaded cutouts to fit
/// against, so it gates on `host_match` and `cutout_download`.
pub struct ApertureConstructionRunner<B> {
    builder: B,
}

impl<B> ApertureConstructionRunner<B> {
    /// Wrap a fitting collaborator.
    pub fn new(builder: B) -> Self {
        Self { builder }
    }
}

#[async_trait]
impl<B> TaskRunner for ApertureConstructionRunner<B>
where
    B: ApertureBuilder,
{
    fn task_name(&self) -> TaskName {
        TaskName::new("aperture_construction")
    }

    fn prerequisites(&self) -> BTreeMap<TaskName, StatusMessage> {
        BTreeMap::from([
            (TaskName::new("host_match"), StatusMessage::processed()),
            (TaskName::new("cutout_download"), StatusMessage::processed()),
        ])
    }

    async fn process(&self, transient: &Transient) -> AppResult<StepOutcome> {
        let apertures = self.builder.build_apertures(transient).await?;
        if apertures.is_empty() {
            tracing::info!("no aperture could be fit for {}", transient.name);
            return Ok(StepOutcome::new(StatusMessage::new("no aperture")));
        }

        let mut outcome = StepOutcome::processed();
        for aperture in &apertures {
            let key =
                ArtifactKey::new(&transient.name, "aperture").with_discriminator(&aperture.filter);
            outcome =
                outcome.with_artifact(ArtifactWrite::new(key, serde_json::to_value(aperture)?));
        }
        Ok(outcome)
    }
}
