use self::cli::{Cli, Command};
use self::cluster::KubeClusterClient;
use self::config::{Ceiling, Config};
use self::error::{LaunchError, SpannedErr, SpannedExt, TransportError};
use self::launcher::hook::EnqueueAdmissionHook;
use self::launcher::{LaunchOutcome, Launcher};
use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_error::ExtractSpanTrace;
use tracing_error::SpanTrace;

pub(crate) mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod kubernetes_objects;
pub mod launcher;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load config.\n{0}")]
    ConfigError(#[from] config::ConfigLoadError),

    #[error("Job '{0}' is not defined in the config file")]
    UnknownJob(String),

    #[error("Failed to initialize kubernetes client.\n{0}")]
    KubeClientError(#[from] SpannedErr<TransportError>),

    #[error("Worker launch stopped due to following error:\n{0}")]
    LaunchError(#[from] LaunchError),
}

impl ExtractSpanTrace for AppError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            AppError::KubeClientError(e) => e.span_trace(),
            AppError::LaunchError(e) => e.span_trace(),
            _ => None,
        }
    }
}

pub async fn app() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = Config::new_from_file(&cli.config).await?;

    info!("Config Loaded.");

    let job_key = cli.command.job();
    let job = config
        .jobs
        .get(job_key)
        .ok_or_else(|| AppError::UnknownJob(job_key.to_string()))?;

    if !config.launcher.enabled {
        info!("Launcher is disabled; not contacting the cluster.");
        return Ok(());
    }

    let cluster = KubeClusterClient::try_default()
        .await
        .with_span_trace()?
        .with_field_manager(config.launcher.field_manager.clone());

    info!("Kubernetes Client Initialized.");

    let launcher = Launcher::new(config.launcher.clone(), cluster);

    match &cli.command {
        Command::Enqueue { .. } => match launcher.before_enqueue(job).await? {
            LaunchOutcome::Launched {
                job_name,
                namespace,
            } => info!("Worker job '{namespace}/{job_name}' created."),
            LaunchOutcome::Denied {
                group,
                active,
                ceiling,
            } => info!("Group '{group}' is at capacity ({active}/{ceiling}); no worker created."),
            LaunchOutcome::Disabled => info!("Launcher is disabled; no worker created."),
        },
        Command::Status { .. } => {
            let manifest = job.job_manifest();
            let group = manifest.name().unwrap_or(job_key);
            let namespace = launcher.namespace_for(&manifest);
            let ceiling = Ceiling::effective(job.max_workers(), launcher.config().max_workers);
            let usage = launcher.slot_usage(&namespace.namespace, group).await?;

            println!("group:     {group}");
            println!("namespace: {}", namespace.namespace);
            println!("ceiling:   {ceiling}");
            println!("active:    {}", usage.active.len());
            for active in &usage.active {
                println!("  - {}", active.name);
            }
            println!("finished:  {}", usage.finished.len());
            for pod in &usage.oom_killed {
                println!(
                    "oom-killed pod: {} (job {})",
                    pod.name,
                    pod.job_name.as_deref().unwrap_or("<unknown>")
                );
            }
        }
    }

    Ok(())
}
