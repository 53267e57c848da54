pub mod job;
pub mod manifest;
pub mod namespace;
pub mod pod;

pub use job::ObservedJob;
pub use manifest::Manifest;
pub use namespace::{NamespaceContext, NamespaceSource};
pub use pod::{ContainerTermination, ObservedPod};

pub(crate) const MANAGER_ROLE_NAME: &str = "resque-kubernetes";

/// Role marker label. Other tooling selects on it, so the key and values are fixed.
pub const ROLE_LABEL: &str = "resque-kubernetes";
pub const ROLE_JOB: &str = "job";
pub const ROLE_POD: &str = "pod";

/// Grouping key used for admission counting.
pub const GROUP_LABEL: &str = "resque-kubernetes-group";

/// Label the Job controller puts on every pod it owns.
pub(crate) const JOB_NAME_LABEL: &str = "job-name";
pub(crate) const BATCH_JOB_NAME_LABEL: &str = "batch.kubernetes.io/job-name";

pub(crate) const FALLBACK_NAMESPACE: &str = "default";

pub fn job_selector(group: &str) -> String {
    format!("{ROLE_LABEL}={ROLE_JOB},{GROUP_LABEL}={group}")
}

pub fn pod_selector(group: &str) -> String {
    format!("{ROLE_LABEL}={ROLE_POD},{GROUP_LABEL}={group}")
}
