//! Admission Controller
//!
//! Decides, right before a job is enqueued, whether another worker Job may be
//! launched for its group, and launches it if so. Every decision re-reads the
//! cluster; nothing is cached and no lock is held between the read and the
//! create, so concurrent enqueues may briefly overshoot the ceiling.

pub mod builder;
pub mod hook;

use tracing::{Level, info, instrument, warn};

use crate::cluster::{ClusterClient, CreateJobError};
use crate::config::{Ceiling, LauncherConfig};
use crate::error::{LaunchError, MalformedManifestError, SpannedExt};
use crate::kubernetes_objects::{
    Manifest, NamespaceContext, ObservedJob, ObservedPod, job_selector,
    pod_selector,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Launcher switched off; the cluster was not contacted.
    Disabled,
    Denied {
        group: String,
        active: usize,
        ceiling: Ceiling,
    },
    Launched {
        job_name: String,
        namespace: String,
    },
}

/// Worker Jobs of one group as observed right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotUsage {
    pub active: Vec<ObservedJob>,
    pub finished: Vec<ObservedJob>,
    /// Pods of this group's Jobs whose containers were terminated as `OOMKilled`.
    pub oom_killed: Vec<ObservedPod>,
}

pub struct Launcher<C> {
    config: LauncherConfig,
    cluster: C,
}

impl<C: ClusterClient> Launcher<C> {
    pub fn new(config: LauncherConfig, cluster: C) -> Self {
        Launcher { config, cluster }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn namespace_for(&self, manifest: &Manifest) -> NamespaceContext {
        let auth_context = self.cluster.default_namespace();
        NamespaceContext::resolve(manifest, auth_context.as_deref())
    }

    /// Partition the group's Jobs by whether they still hold a worker slot.
    ///
    /// Job counters are authoritative. OOM-killed pods are reported alongside
    /// but never move a Job between the two lists.
    #[instrument(
        "slot_usage",
        level = Level::TRACE,
        skip_all,
        fields(kubernetes_namespace = %namespace, group = %group)
    )]
    pub async fn slot_usage(&self, namespace: &str, group: &str) -> Result<SlotUsage, LaunchError> {
        let jobs = self
            .cluster
            .list_jobs(namespace, &job_selector(group))
            .await
            .with_span_trace()?;
        if jobs.is_empty() {
            return Ok(SlotUsage::default());
        }

        let (active, finished): (Vec<_>, Vec<_>) =
            jobs.into_iter().partition(ObservedJob::occupies_slot);

        let pods = self
            .cluster
            .list_pods(namespace, &pod_selector(group))
            .await
            .with_span_trace()?;
        let oom_killed: Vec<ObservedPod> = pods
            .into_iter()
            .filter(|pod| pod.oom_killed())
            .filter(|pod| {
                pod.job_name.as_deref().is_some_and(|job_name| {
                    active.iter().chain(&finished).any(|job| job.name == job_name)
                })
            })
            .collect();

        for pod in &oom_killed {
            let job_name = pod.job_name.as_deref().unwrap_or("<unknown>");
            if active.iter().any(|job| job.name == job_name) {
                warn!(
                    "Pod '{}' of job '{}' was OOMKilled; the job keeps its slot until its counters report completion.",
                    pod.name, job_name
                );
            } else {
                warn!("Pod '{}' of finished job '{}' was OOMKilled.", pod.name, job_name);
            }
        }

        Ok(SlotUsage {
            active,
            finished,
            oom_killed,
        })
    }

    /// True iff fewer than `ceiling` Jobs of `group` are active.
    pub async fn should_admit(
        &self,
        namespace: &str,
        group: &str,
        ceiling: Ceiling,
    ) -> Result<bool, LaunchError> {
        if !self.config.enabled {
            return Ok(false);
        }
        let usage = self.slot_usage(namespace, group).await?;
        Ok(ceiling.admits(usage.active.len()))
    }

    /// Launch one worker Job for `base` if its group has a free slot.
    #[instrument(
        "try_launch",
        skip_all,
        fields(group = base.name().unwrap_or("<unnamed>"), ceiling = %ceiling)
    )]
    pub async fn try_launch(
        &self,
        base: &Manifest,
        ceiling: Ceiling,
    ) -> Result<LaunchOutcome, LaunchError> {
        if !self.config.enabled {
            info!("Launcher disabled; not contacting the cluster.");
            return Ok(LaunchOutcome::Disabled);
        }

        let group = base
            .name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| MalformedManifestError::MissingField("metadata.name".to_string()))
            .with_span_trace()?;
        let namespace = self.namespace_for(base);

        let usage = self.slot_usage(&namespace.namespace, group).await?;
        let active = usage.active.len();
        if !ceiling.admits(active) {
            info!(
                "Group '{}' has {} active job(s), ceiling {}; not launching a worker.",
                group, active, ceiling
            );
            return Ok(LaunchOutcome::Denied {
                group: group.to_string(),
                active,
                ceiling,
            });
        }

        let manifest = builder::build(base, group, &namespace).with_span_trace()?;
        let job_name = manifest.name().unwrap_or_default().to_string();

        match self.cluster.create_job(&namespace.namespace, &manifest).await {
            Ok(()) => {}
            Err(CreateJobError::Transport(e)) => Err::<(), _>(e).with_span_trace()?,
            Err(CreateJobError::Malformed(e)) => Err::<(), _>(e).with_span_trace()?,
        }

        info!(
            "Launched job '{}' in namespace '{}' ({} of {} slot(s) were in use).",
            job_name, namespace.namespace, active, ceiling
        );
        Ok(LaunchOutcome::Launched {
            job_name,
            namespace: namespace.namespace,
        })
    }
}
