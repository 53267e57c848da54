//! Capability Mixin
//!
//! Any job-like type opts into worker launching by implementing
//! [`EnqueueAdmissionHook`]; the broker then calls
//! [`Launcher::before_enqueue`] right before it persists the job payload.

use std::sync::Arc;

use serde_json::json;
use tracing::instrument;

use super::{LaunchOutcome, Launcher};
use crate::cluster::ClusterClient;
use crate::config::Ceiling;
use crate::error::LaunchError;
use crate::kubernetes_objects::Manifest;

pub const DEFAULT_JOB_NAME: &str = "resque-worker";

pub trait EnqueueAdmissionHook {
    /// Job template for this job's workers.
    fn job_manifest(&self) -> Manifest {
        default_job_manifest()
    }

    /// Overrides the process-wide ceiling when set.
    fn max_workers(&self) -> Option<u32> {
        None
    }
}

impl<T: EnqueueAdmissionHook + ?Sized> EnqueueAdmissionHook for &T {
    fn job_manifest(&self) -> Manifest {
        (**self).job_manifest()
    }

    fn max_workers(&self) -> Option<u32> {
        (**self).max_workers()
    }
}

impl<T: EnqueueAdmissionHook + ?Sized> EnqueueAdmissionHook for Box<T> {
    fn job_manifest(&self) -> Manifest {
        (**self).job_manifest()
    }

    fn max_workers(&self) -> Option<u32> {
        (**self).max_workers()
    }
}

impl<T: EnqueueAdmissionHook + ?Sized> EnqueueAdmissionHook for Arc<T> {
    fn job_manifest(&self) -> Manifest {
        (**self).job_manifest()
    }

    fn max_workers(&self) -> Option<u32> {
        (**self).max_workers()
    }
}

/// A job described by data rather than by its own type, e.g. loaded from
/// the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDefinition {
    manifest: Manifest,
    max_workers: Option<u32>,
}

impl JobDefinition {
    pub fn new(manifest: Manifest, max_workers: Option<u32>) -> Self {
        JobDefinition {
            manifest,
            max_workers,
        }
    }
}

impl EnqueueAdmissionHook for JobDefinition {
    fn job_manifest(&self) -> Manifest {
        self.manifest.clone()
    }

    fn max_workers(&self) -> Option<u32> {
        self.max_workers
    }
}

/// Single worker container running every queue.
pub fn default_job_manifest() -> Manifest {
    Manifest::new(json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": {
            "name": DEFAULT_JOB_NAME,
        },
        "spec": {
            "template": {
                "metadata": {
                    "name": DEFAULT_JOB_NAME,
                },
                "spec": {
                    "containers": [{
                        "name": "worker",
                        "image": "resque-worker",
                        "env": [
                            { "name": "QUEUE", "value": "*" },
                        ],
                    }],
                },
            },
        },
    }))
}

impl<C: ClusterClient> Launcher<C> {
    /// Before-enqueue hook: launches at most one worker Job for `job`.
    #[instrument("before_enqueue", skip_all)]
    pub async fn before_enqueue<J>(&self, job: &J) -> Result<LaunchOutcome, LaunchError>
    where
        J: EnqueueAdmissionHook + ?Sized,
    {
        if !self.config().enabled {
            return Ok(LaunchOutcome::Disabled);
        }
        let ceiling = Ceiling::effective(job.max_workers(), self.config().max_workers);
        let manifest = job.job_manifest();
        self.try_launch(&manifest, ceiling).await
    }
}
