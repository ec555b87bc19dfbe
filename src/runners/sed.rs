//! Host SED fitting step.
//!
//! The terminal step of the pipeline. Fits a stellar population model to the
//! host photometry and persists the posterior percentiles of the physical
//! parameters. Gates on both `aperture_photometry` and `redshift_lookup`
//! being `processed`, so transients whose host has no cataloged redshift are
//! never fit.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{
    AppResult, ArtifactKey, ArtifactWrite, StatusMessage, StepOutcome, TaskName, TaskRunner,
    Transient,
};

/// Posterior percentiles of the fitted host properties, persisted as the
/// `sed` artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SedPosterior {
    /// 16th percentile of log stellar mass.
    pub log_mass_16: f64,
    /// Median log stellar mass.
    pub log_mass_50: f64,
    /// 84th percentile of log stellar mass.
    pub log_mass_84: f64,
    /// 16th percentile of log specific star formation rate.
    pub log_ssfr_16: f64,
    /// Median log specific star formation rate.
    pub log_ssfr_50: f64,
    /// 84th percentile of log specific star formation rate.
    pub log_ssfr_84: f64,
}

/// Stellar-population fitting collaborator.
#[async_trait]
pub trait SedFitter: Send + Sync {
    /// Fit the host SED and return the posterior summary.
    async fn fit_sed(&self, transient: &Transient) -> AppResult<SedPosterior>;
}

/// Runner for the `sed_fitting` task.
pub struct SedFittingRunner<F> {
    fitter: F,
}

impl<F> SedFittingRunner<F> {
    /// Wrap a fitting collaborator.
    pub fn new(fitter: F) -> Self {
        Self { fitter }
    }
}

#[async_trait]
impl<F> TaskRunner for SedFittingRunner<F>
where
    F: SedFitter,
{
    fn task_name(&self) -> TaskName {
        TaskName::new("sed_fitting")
    }

    fn prerequisites(&self) -> BTreeMap<TaskName, StatusMessage> {
        BTreeMap::from([
            (
                TaskName::new("aperture_photometry"),
                StatusMessage::processed(),
            ),
            (TaskName::new("redshift_lookup"), StatusMessage::processed()),
        ])
    }

    async fn process(&self, transient: &Transient) -> AppResult<StepOutcome> {
        let posterior = self.fitter.fit_sed(transient).await?;
        tracing::info!(
            "fit SED for {}: log mass {:.2}",
            transient.name,
            posterior.log_mass_50
        );
        let key = ArtifactKey::new(&transient.name, "sed").with_discriminator("global");
        Ok(StepOutcome::processed()
            .with_artifact(ArtifactWrite::new(key, serde_json::to_value(&posterior)?)))
    }
}
