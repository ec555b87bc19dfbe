//! Survey cutout download step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, ArtifactKey, ArtifactWrite, StepOutcome, TaskName, TaskRunner, Transient};

/// One downloaded image, persisted as a `cutout` artifact keyed by filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoutImage {
    /// Survey filter the image was taken in, e.g. `PanSTARRS_g`.
    pub filter: String,
    /// Location of the stored FITS file.
    pub fits_uri: String,
}

/// Image-download collaborator.
#[async_trait]
pub trait CutoutFetcher: Send + Sync {
    /// Download cutouts centered on the transient, one per filter with
    /// coverage. Filters without coverage are simply absent from the result.
    async fn fetch_cutouts(&self, transient: &Transient) -> AppResult<Vec<CutoutImage>>;
}

/// Runner for the `cutout_download` task.
pub struct CutoutDownloadRunner<F> {
    fetcher: F,
}

impl<F> CutoutDownloadRunner<F> {
    /// Wrap a download collaborator.
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl<F> TaskRunner for CutoutDownloadRunner<F>
where
    F: CutoutFetcher,
{
    fn task_name(&self) -> TaskName {
        TaskName::new("cutout_download")
    }

    async fn process(&self, transient: &Transient) -> AppResult<StepOutcome> {
        let cutouts = self.fetcher.fetch_cutouts(transient).await?;
        tracing::debug!("downloaded {} cutouts for {}", cutouts.len(), transient.name);

        let mut outcome = StepOutcome::processed();
        for cutout in &cutouts {
            let key = ArtifactKey::new(&transient.name, "cutout").with_discriminator(&cutout.filter);
            outcome = outcome.with_artifact(ArtifactWrite::new(key, serde_json::to_value(cutout)?));
        }
        Ok(outcome)
    }
}
