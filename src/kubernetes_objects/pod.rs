use k8s_openapi::api::core::v1::{ContainerStatus, Pod};

use super::{BATCH_JOB_NAME_LABEL, JOB_NAME_LABEL};

pub const OOM_KILLED_REASON: &str = "OOMKilled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTermination {
    pub container: String,
    pub reason: Option<String>,
    pub exit_code: i32,
}

/// Snapshot of a worker pod: its phase and the terminal state of each container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedPod {
    pub name: String,
    /// Owning Job, taken from the labels the Job controller sets.
    pub job_name: Option<String>,
    pub phase: Option<String>,
    pub terminations: Vec<ContainerTermination>,
}

impl ObservedPod {
    pub fn oom_killed(&self) -> bool {
        self.terminations
            .iter()
            .any(|t| t.reason.as_deref() == Some(OOM_KILLED_REASON))
    }
}

impl From<&Pod> for ObservedPod {
    fn from(pod: &Pod) -> Self {
        let labels = pod.metadata.labels.as_ref();
        let job_name = labels
            .and_then(|l| l.get(BATCH_JOB_NAME_LABEL).or_else(|| l.get(JOB_NAME_LABEL)))
            .cloned();
        let status = pod.status.as_ref();

        ObservedPod {
            name: pod.metadata.name.clone().unwrap_or_default(),
            job_name,
            phase: status.and_then(|s| s.phase.clone()),
            terminations: status
                .and_then(|s| s.container_statuses.as_ref())
                .map(|statuses| statuses.iter().filter_map(termination).collect())
                .unwrap_or_default(),
        }
    }
}

/// Current terminal state, or the last one if the container was restarted.
fn termination(status: &ContainerStatus) -> Option<ContainerTermination> {
    let current = status.state.as_ref().and_then(|s| s.terminated.as_ref());
    let previous = status.last_state.as_ref().and_then(|s| s.terminated.as_ref());
    current.or(previous).map(|terminated| ContainerTermination {
        container: status.name.clone(),
        reason: terminated.reason.clone(),
        exit_code: terminated.exit_code,
    })
}
