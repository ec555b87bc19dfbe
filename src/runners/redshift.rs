//! Host redshift lookup step.
//!
//! Requires a processed `host_match`: the resolver queries external catalogs
//! for the redshift of the associated host. A host that no catalog lists is
//! committed as `no host redshift`, which keeps SED fitting away from the
//! transient without marking the lookup failed.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{
    AppResult, ArtifactKey, ArtifactWrite, StatusMessage, StepOutcome, TaskName, TaskRunner,
    Transient,
};

/// Redshift record persisted as the `redshift` artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRedshift {
    /// Spectroscopic redshift of the host.
    pub redshift: f64,
    /// Catalog the value came from, e.g. `ned` or `sdss`.
    pub source: String,
}

/// Catalog-lookup collaborator.
#[async_trait]
pub trait RedshiftResolver: Send + Sync {
    /// Look up the redshift of the transient's host, or `None` when no
    /// catalog lists one.
    async fn resolve_redshift(&self, transient: &Transient) -> AppResult<Option<HostRedshift>>;
}

/// Runner for the `redshift_lookup` task.
pub struct RedshiftLookupRunner<R> {
    resolver: R,
}

impl<R> RedshiftLookupRunner<R> {
    /// Wrap a lookup collaborator.
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl<R> TaskRunner for RedshiftLookupRunner<R>
where
    R: RedshiftResolver,
{
    fn task_name(&self) -> TaskName {
        TaskName::new("redshift_lookup")
    }

    fn prerequisites(&self) -> BTreeMap<TaskName, StatusMessage> {
        BTreeMap::from([(TaskName::new("host_match"), StatusMessage::processed())])
    }

    async fn process(&self, transient: &Transient) -> AppResult<StepOutcome> {
        match self.resolver.resolve_redshift(transient).await? {
            Some(found) => {
                let payload = serde_json::to_value(&found)?;
                Ok(StepOutcome::processed().with_artifact(ArtifactWrite::new(
                    ArtifactKey::new(&transient.name, "redshift"),
                    payload,
                )))
            }
            None => Ok(StepOutcome::new(StatusMessage::new("no host redshift"))),
        }
    }
}
