//! Pipeline and store configuration structures.

use std::fs;

use serde::{Deserialize, Serialize};

use crate::core::{StatusCatalog, StatusKind, StatusMessage, TaskCatalog, TaskName};

/// Environment variable naming the JSON configuration file to load.
pub const CONFIG_ENV_VAR: &str = "TRANSIENT_PIPELINE_CONFIG";

/// Register store backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// In-memory store for development/testing.
    InMemory,
    /// JSON snapshot store rooted at a directory.
    File {
        /// Directory the snapshot lives in.
        path: String,
    },
    /// Postgres store.
    Postgres,
}

/// One status label beyond the built-ins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSpec {
    /// Status message, e.g. `no host match`.
    pub message: String,
    /// How the scheduler treats entries holding this status.
    pub kind: StatusKind,
}

/// Root pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Step names making up the task catalog.
    pub tasks: Vec<String>,
    /// Custom statuses added on top of the built-ins.
    pub statuses: Vec<StatusSpec>,
    /// Register store backend selection.
    pub store: StoreBackendConfig,
    /// Seconds between scheduled invocations of each runner.
    pub trigger_interval_secs: u64,
    /// Age in seconds after which an in-flight claim counts as stale.
    pub stale_claim_secs: u64,
    /// Maximum retained audit events.
    pub audit_capacity: usize,
}

impl Default for PipelineConfig {
    /// The standard six-step enrichment pipeline against an in-memory store.
    fn default() -> Self {
        Self {
            tasks: vec![
                "host_match".into(),
                "cutout_download".into(),
                "redshift_lookup".into(),
                "aperture_construction".into(),
                "aperture_photometry".into(),
                "sed_fitting".into(),
            ],
            statuses: vec![
                StatusSpec {
                    message: "no host match".into(),
                    kind: StatusKind::Terminal,
                },
                StatusSpec {
                    message: "no host redshift".into(),
                    kind: StatusKind::Terminal,
                },
                StatusSpec {
                    message: "no aperture".into(),
                    kind: StatusKind::Terminal,
                },
            ],
            store: StoreBackendConfig::InMemory,
            trigger_interval_secs: 60,
            stale_claim_secs: 3600,
            audit_capacity: 1024,
        }
    }
}

impl PipelineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.tasks.is_empty() {
            return Err("at least one task must be defined".into());
        }
        for (index, task) in self.tasks.iter().enumerate() {
            if task.trim().is_empty() {
                return Err(format!("task #{index} has a blank name"));
            }
            if self.tasks[..index].contains(task) {
                return Err(format!("task `{task}` is listed twice"));
            }
        }
        let builtins = [
            StatusMessage::not_processed(),
            StatusMessage::processing(),
            StatusMessage::processed(),
            StatusMessage::failed(),
        ];
        for (index, spec) in self.statuses.iter().enumerate() {
            if spec.message.trim().is_empty() {
                return Err(format!("status #{index} has a blank message"));
            }
            if builtins.iter().any(|b| b.as_str() == spec.message) {
                return Err(format!("status `{}` redefines a built-in", spec.message));
            }
            if self.statuses[..index].iter().any(|s| s.message == spec.message) {
                return Err(format!("status `{}` is listed twice", spec.message));
            }
        }
        if self.trigger_interval_secs == 0 {
            return Err("trigger_interval_secs must be greater than 0".into());
        }
        if self.stale_claim_secs == 0 {
            return Err("stale_claim_secs must be greater than 0".into());
        }
        if self.audit_capacity == 0 {
            return Err("audit_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse pipeline configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: PipelineConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the file named by [`CONFIG_ENV_VAR`], reading
    /// a `.env` file first if one is present. Falls back to the defaults when
    /// the variable is unset.
    pub fn load() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => {
                let raw =
                    fs::read_to_string(&path).map_err(|e| format!("read `{path}`: {e}"))?;
                Self::from_json_str(&raw)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// Build the closed task catalog.
    pub fn task_catalog(&self) -> TaskCatalog {
        TaskCatalog::from_names(self.tasks.iter().map(TaskName::new))
    }

    /// Build the closed status catalog, built-ins plus customs.
    pub fn status_catalog(&self) -> StatusCatalog {
        StatusCatalog::with_defaults().extend(
            self.statuses
                .iter()
                .map(|spec| (StatusMessage::new(&spec.message), spec.kind)),
        )
    }
}
