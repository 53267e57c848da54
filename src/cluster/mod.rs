//! Cluster Client Facade
//!
//! Everything the launcher needs from the control plane: two label-selected
//! reads and one create. The trait is the seam tests mock.

mod kube_client;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::error::TransportError;
use crate::kubernetes_objects::{Manifest, ObservedJob, ObservedPod};

pub use kube_client::KubeClusterClient;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Namespace provided by the client's auth context, if any.
    fn default_namespace(&self) -> Option<String>;

    /// List Jobs matching `label_selector`. No match is an empty list, not an error.
    async fn list_jobs(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<ObservedJob>, TransportError>;

    /// List Pods matching `label_selector`.
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<ObservedPod>, TransportError>;

    /// Create a Job from a finalized manifest.
    async fn create_job(&self, namespace: &str, manifest: &Manifest)
    -> Result<(), CreateJobError>;
}

/// `create_job` can fail before reaching the cluster if the manifest does not
/// describe a valid object.
#[derive(thiserror::Error, Debug)]
pub enum CreateJobError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Malformed(#[from] crate::error::MalformedManifestError),
}
