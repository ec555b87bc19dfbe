//! Host-galaxy association step.
//!
//! Cross-matches the transient position against galaxy catalogs through the
//! [`HostMatcher`] collaborator. A matcher that finds no credible host is a
//! normal outcome, committed as `no host match`; downstream steps gated on
//! `processed` then never pick the transient up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{
    AppResult, ArtifactKey, ArtifactWrite, StatusMessage, StepOutcome, TaskName, TaskRunner,
    Transient,
};

/// Host galaxy record persisted as the `host` artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostGalaxy {
    /// Catalog name of the galaxy.
    pub name: String,
    /// Right ascension in degrees.
    pub ra_deg: f64,
    /// Declination in degrees.
    pub dec_deg: f64,
    /// Catalog redshift, if listed.
    pub redshift: Option<f64>,
}

/// Galaxy cross-matching collaborator.
#[async_trait]
pub trait HostMatcher: Send + Sync {
    /// Find the most probable host for the transient, or `None` when no
    /// association is credible.
    async fn match_host(&self, transient: &Transient) -> AppResult<Option<HostGalaxy>>;
}

/// Runner for the `host_match` task.
pub struct HostMatchRunner<M> {
    matcher: M,
}

impl<M> HostMatchRunner<M> {
    /// Wrap a matching collaborator.
    pub fn new(matcher: M) -> Self {
        Self { matcher }
    }
}

#[async_trait]
impl<M> TaskRunner for HostMatchRunner<M>
where
    M: HostMatcher,
{
    fn task_name(&self) -> TaskName {
        TaskName::new("host_match")
    }

    fn failure_status(&self) -> StatusMessage {
        StatusMessage::new("no host match")
    }

    async fn process(&self, transient: &Transient) -> AppResult<StepOutcome> {
        match self.matcher.match_host(transient).await? {
            Some(host) => {
                let payload = serde_json::to_value(&host)?;
                Ok(StepOutcome::processed().with_artifact(ArtifactWrite::new(
                    ArtifactKey::new(&transient.name, "host"),
                    payload,
                )))
            }
            None => {
                tracing::info!("no credible host for {}", transient.name);
                Ok(StepOutcome::new(StatusMessage::new("no host match")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedMatcher {
        host: Option<HostGalaxy>,
    }

    #[async_trait]
    impl HostMatcher for FixedMatcher {
        async fn match_host(&self, _transient: &Transient) -> AppResult<Option<HostGalaxy>> {
            Ok(self.host.clone())
        }
    }

    #[tokio::test]
    async fn test_match_stages_host_artifact() {
        let runner = HostMatchRunner::new(FixedMatcher {
            host: Some(HostGalaxy {
                name: "NGC 5128".into(),
                ra_deg: 201.36,
                dec_deg: -43.02,
                redshift: Some(0.0018),
            }),
        });
        let transient = Transient::new("2022abc", 1_000, 201.4, -43.0);

        let outcome = runner.process(&transient).await.unwrap();
        assert_eq!(outcome.status, StatusMessage::processed());
        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.artifacts[0].key.kind, "host");
        assert_eq!(outcome.artifacts[0].payload["name"], "NGC 5128");
    }

    #[tokio::test]
    async fn test_no_match_is_a_normal_outcome() {
        let runner = HostMatchRunner::new(FixedMatcher { host: None });
        let transient = Transient::new("2022abc", 1_000, 201.4, -43.0);

        let outcome = runner.process(&transient).await.unwrap();
        assert_eq!(outcome.status, StatusMessage::new("no host match"));
        assert!(outcome.artifacts.is_empty());
    }
}
