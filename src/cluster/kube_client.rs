use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{DynamicObject, ListParams, PostParams};
use kube::discovery::ApiResource;
use kube::{Api, Client};
use tracing::{Instrument, debug, trace_span};

use super::{ClusterClient, CreateJobError};
use crate::error::{MalformedManifestError, TransportError};
use crate::kubernetes_objects::{MANAGER_ROLE_NAME, Manifest, ObservedJob, ObservedPod};

/// [`ClusterClient`] backed by a kube-rs client.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    field_manager: String,
}

impl KubeClusterClient {
    /// Use a client the host application already configured, as is.
    pub fn new(client: Client) -> Self {
        KubeClusterClient {
            client,
            field_manager: MANAGER_ROLE_NAME.to_string(),
        }
    }

    /// Build a client from ambient credentials: the in-cluster service
    /// account, or the local kubeconfig.
    pub async fn try_default() -> Result<Self, TransportError> {
        let client = Client::try_default()
            .await
            .map_err(TransportError::ClientInit)?;
        Ok(KubeClusterClient::new(client))
    }

    pub fn with_field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.field_manager = field_manager.into();
        self
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    fn default_namespace(&self) -> Option<String> {
        Some(self.client.default_namespace().to_string())
    }

    async fn list_jobs(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<ObservedJob>, TransportError> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let jobs = api
            .list(&ListParams::default().labels(label_selector))
            .instrument(trace_span!(
                "list_jobs",
                kubernetes_namespace = %namespace,
                label_selector = %label_selector
            ))
            .await
            .map_err(|source| TransportError::ListJobs {
                namespace: namespace.to_string(),
                source,
            })?;

        debug!("Found {} job(s) matching '{}'.", jobs.items.len(), label_selector);
        Ok(jobs.items.iter().map(ObservedJob::from).collect())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<ObservedPod>, TransportError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default().labels(label_selector))
            .instrument(trace_span!(
                "list_pods",
                kubernetes_namespace = %namespace,
                label_selector = %label_selector
            ))
            .await
            .map_err(|source| TransportError::ListPods {
                namespace: namespace.to_string(),
                source,
            })?;

        debug!("Found {} pod(s) matching '{}'.", pods.items.len(), label_selector);
        Ok(pods.items.iter().map(ObservedPod::from).collect())
    }

    async fn create_job(
        &self,
        namespace: &str,
        manifest: &Manifest,
    ) -> Result<(), CreateJobError> {
        // Submitted untyped so fields unknown to k8s-openapi survive.
        let object: DynamicObject = serde_json::from_value(manifest.as_value().clone())
            .map_err(MalformedManifestError::InvalidObject)?;
        let resource = ApiResource::erase::<Job>(&());
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &resource);

        let post_params = PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        };

        let job_name = manifest.name().unwrap_or("<unknown>").to_string();
        api.create(&post_params, &object)
            .instrument(trace_span!(
                "create_job",
                kubernetes_namespace = %namespace,
                job_name = %job_name
            ))
            .await
            .map_err(|source| TransportError::CreateJob {
                namespace: namespace.to_string(),
                job_name,
                source,
            })?;
        Ok(())
    }
}
