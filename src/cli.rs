// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use registry_gc::output::OutputMode;
use registry_gc::policy::KeepRule;
use registry_gc::types::RepositoryName;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "registry-gc")]
#[command(about = "Retention-policy garbage collection for container registries")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file (default: discover in current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Registry base URL, overriding the configuration file
    #[arg(long, global = true)]
    pub registry: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Normal)]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Normal,
    Quiet,
    Json,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Normal => OutputMode::Normal,
            OutputFormat::Quiet => OutputMode::Quiet,
            OutputFormat::Json => OutputMode::Json,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new registry-gc.yml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// List repositories and their images
    List {
        /// Only these repositories (repeatable)
        #[arg(long = "repo", value_name = "NAME")]
        repositories: Vec<RepositoryName>,
    },

    /// Apply the retention policy and delete expired images
    Gc(GcArgs),

    /// Serve per-repository image counts as Prometheus metrics
    Serve {
        /// Listen address (default from config: 0.0.0.0:8070)
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Metrics path (default from config: /metrics)
        #[arg(long)]
        path: Option<String>,
    },
}

#[derive(Args)]
pub struct GcArgs {
    /// Keep the N most recent images whose tags start with PREFIX (repeatable)
    #[arg(long = "keep", value_name = "PREFIX=N")]
    pub keep: Vec<KeepRule>,

    /// Delete images without any tag
    #[arg(long)]
    pub delete_untagged: bool,

    /// Upper bound on images left in each repository
    #[arg(long, value_name = "N")]
    pub max_images: Option<NonZeroUsize>,

    /// Only these repositories (repeatable)
    #[arg(long = "repo", value_name = "NAME")]
    pub repositories: Vec<RepositoryName>,

    /// Report what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,

    /// Identifiers per deletion request
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,
}
