use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(version, about = "Launch Kubernetes worker Jobs for queued background jobs")]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub(crate) command: Command,

    #[clap(
        short,
        long,
        default_value = "/etc/resque-kubernetes/config.yaml",
        global = true
    )]
    pub(crate) config: PathBuf,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Command {
    /// Run the before-enqueue hook once for a configured job
    Enqueue { job: String },

    /// Show worker slot usage for a configured job without launching anything
    Status { job: String },
}

impl Command {
    pub(crate) fn job(&self) -> &str {
        match self {
            Command::Enqueue { job } | Command::Status { job } => job,
        }
    }
}
