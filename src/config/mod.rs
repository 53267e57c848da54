mod raw;

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use self::raw::RawConfig;
use crate::kubernetes_objects::MANAGER_ROLE_NAME;
use crate::launcher::hook::JobDefinition;

pub use self::raw::ConfigParseError;

/// Maximum number of concurrently active Jobs for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ceiling {
    Limited(u32),
    Unlimited,
}

impl Ceiling {
    /// Job-specific override first, then the process-wide ceiling.
    /// Neither set denies.
    pub fn effective(job_override: Option<u32>, process_default: Option<Ceiling>) -> Ceiling {
        job_override
            .map(Ceiling::Limited)
            .or(process_default)
            .unwrap_or(Ceiling::Limited(0))
    }

    pub fn admits(&self, active: usize) -> bool {
        match self {
            Ceiling::Limited(max) => active < *max as usize,
            Ceiling::Unlimited => true,
        }
    }
}

impl std::fmt::Display for Ceiling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ceiling::Limited(max) => write!(f, "{max}"),
            Ceiling::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Process-wide launcher settings, fixed before any hook fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    pub enabled: bool,
    pub max_workers: Option<Ceiling>,
    pub field_manager: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        LauncherConfig {
            enabled: true,
            max_workers: None,
            field_manager: MANAGER_ROLE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub launcher: LauncherConfig,
    pub jobs: BTreeMap<String, JobDefinition>,
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Deserialize {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config file '{path}': {source}")]
    Invalid {
        path: String,
        #[source]
        source: ConfigParseError,
    },
}

impl Config {
    pub async fn new_from_file(path: &Path) -> Result<Config, ConfigLoadError> {
        let display = path.display().to_string();
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigLoadError::Read {
                    path: display.clone(),
                    source,
                })?;
        let raw: RawConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigLoadError::Deserialize {
                path: display.clone(),
                source,
            })?;
        Config::try_from(raw).map_err(|source| ConfigLoadError::Invalid {
            path: display,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_ceiling_precedence() {
        assert_eq!(
            Ceiling::effective(Some(3), Some(Ceiling::Limited(10))),
            Ceiling::Limited(3)
        );
        assert_eq!(
            Ceiling::effective(Some(3), Some(Ceiling::Unlimited)),
            Ceiling::Limited(3)
        );
        assert_eq!(
            Ceiling::effective(None, Some(Ceiling::Unlimited)),
            Ceiling::Unlimited
        );
        assert_eq!(Ceiling::effective(None, None), Ceiling::Limited(0));
    }

    #[test]
    fn test_admits_iff_active_below_ceiling() {
        for ceiling in 0..6u32 {
            for active in 0..8usize {
                assert_eq!(
                    Ceiling::Limited(ceiling).admits(active),
                    active < ceiling as usize,
                    "ceiling={ceiling} active={active}"
                );
            }
        }
        assert!(!Ceiling::Limited(0).admits(0));
        assert!(Ceiling::Unlimited.admits(10_000));
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let err = Config::new_from_file(Path::new("/nonexistent/resque-kubernetes.yaml"))
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigLoadError::Read { .. }));
    }
}
