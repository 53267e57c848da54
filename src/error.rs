use std::fmt::Display;

use thiserror::Error;
use tracing_error::{ExtractSpanTrace, SpanTrace};

#[derive(Debug)]
pub struct SpannedErr<T> {
    pub err: T,
    pub span_trace: SpanTrace,
}

pub trait SpannedExt<T, E> {
    fn with_span_trace(self) -> Result<T, SpannedErr<E>>;
}

impl<T, E> SpannedExt<T, E> for Result<T, E> {
    fn with_span_trace(self) -> Result<T, SpannedErr<E>> {
        self.map_err(|e| SpannedErr {
            err: e,
            span_trace: SpanTrace::capture(),
        })
    }
}

impl<E> ExtractSpanTrace for SpannedErr<E> {
    fn span_trace(&self) -> Option<&SpanTrace> {
        Some(&self.span_trace)
    }
}

impl<T: Display> Display for SpannedErr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.err, f)
    }
}

impl<U: std::error::Error> std::error::Error for SpannedErr<U> {}

/// Failures talking to the cluster control plane. Never retried here.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to initialize kubernetes client: {0}")]
    ClientInit(#[source] kube::Error),

    #[error("Failed to list jobs in namespace '{namespace}': {source}")]
    ListJobs {
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("Failed to list pods in namespace '{namespace}': {source}")]
    ListPods {
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("Failed to create job '{job_name}' in namespace '{namespace}': {source}")]
    CreateJob {
        namespace: String,
        job_name: String,
        #[source]
        source: kube::Error,
    },
}

/// The caller-supplied job template is missing structure the launcher relies on.
#[derive(Error, Debug)]
pub enum MalformedManifestError {
    #[error("Manifest is missing required field '{0}'")]
    MissingField(String),

    #[error("Manifest field '{0}' must be a mapping")]
    NotAMapping(String),

    #[error("Manifest field '{0}' must be a sequence")]
    NotASequence(String),

    #[error("Manifest field '{0}' must be a string")]
    NotAString(String),

    #[error("Manifest must declare at least one container in 'spec.template.spec.containers'")]
    NoContainers,

    #[error("Manifest cannot be converted into a Job object: {0}")]
    InvalidObject(#[source] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Cluster transport error: {0}")]
    Transport(#[from] SpannedErr<TransportError>),

    #[error("Malformed job manifest: {0}")]
    MalformedManifest(#[from] SpannedErr<MalformedManifestError>),
}

impl ExtractSpanTrace for LaunchError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            LaunchError::Transport(e) => e.span_trace(),
            LaunchError::MalformedManifest(e) => e.span_trace(),
        }
    }
}
