use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use super::{Ceiling, Config, LauncherConfig};
use crate::kubernetes_objects::{MANAGER_ROLE_NAME, Manifest};
use crate::launcher::hook::JobDefinition;

#[cfg_attr(test, derive(PartialEq))]
#[derive(Deserialize, Debug, Clone)]
pub(super) struct RawConfig {
    #[serde(default = "default_enabled")]
    pub(super) enabled: bool,

    /// Process-wide ceiling: an integer, or `unlimited`
    pub(super) max_workers: Option<RawCeiling>,

    /// Field manager recorded on created Jobs
    pub(super) field_manager: Option<String>,

    #[serde(default)]
    pub(super) jobs: BTreeMap<String, RawJob>,
}

#[cfg_attr(test, derive(PartialEq))]
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub(super) enum RawCeiling {
    Count(u32),
    Keyword(String),
}

#[cfg_attr(test, derive(PartialEq))]
#[derive(Deserialize, Debug, Clone)]
pub(super) struct RawJob {
    /// Overrides the process-wide ceiling for this job
    pub(super) max_workers: Option<u32>,

    /// Kubernetes Job template
    pub(super) manifest: Manifest,
}

const fn default_enabled() -> bool {
    true
}

#[derive(Error, Debug)]
pub enum ConfigParseError {
    #[error("max_workers must be a non-negative integer or 'unlimited', got '{0}'")]
    UnknownCeiling(String),

    #[error("field_manager must not be empty")]
    EmptyFieldManager,

    #[error("Job keys must not be empty")]
    EmptyJobKey,

    #[error("Job '{job}' manifest must declare metadata.name")]
    ManifestNameMissing { job: String },
}

impl TryFrom<RawCeiling> for Ceiling {
    type Error = ConfigParseError;
    fn try_from(raw: RawCeiling) -> Result<Self, Self::Error> {
        match raw {
            RawCeiling::Count(max) => Ok(Ceiling::Limited(max)),
            RawCeiling::Keyword(word) if word.eq_ignore_ascii_case("unlimited") => {
                Ok(Ceiling::Unlimited)
            }
            RawCeiling::Keyword(word) => Err(ConfigParseError::UnknownCeiling(word)),
        }
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigParseError;
    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let field_manager = match raw.field_manager {
            Some(manager) if manager.is_empty() => {
                return Err(ConfigParseError::EmptyFieldManager);
            }
            Some(manager) => manager,
            None => MANAGER_ROLE_NAME.to_string(),
        };

        let launcher = LauncherConfig {
            enabled: raw.enabled,
            max_workers: raw.max_workers.map(Ceiling::try_from).transpose()?,
            field_manager,
        };

        let jobs = raw
            .jobs
            .into_iter()
            .map(|(key, job)| {
                if key.is_empty() {
                    return Err(ConfigParseError::EmptyJobKey);
                }
                if job.manifest.name().is_none_or(str::is_empty) {
                    return Err(ConfigParseError::ManifestNameMissing { job: key });
                }
                let definition = JobDefinition::new(job.manifest, job.max_workers);
                Ok((key, definition))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigParseError>>()?;

        Ok(Config { launcher, jobs })
    }
}
