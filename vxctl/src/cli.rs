//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vxctl")]
#[command(about = "Run the Vertex AI node over local input items")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Google Cloud project ID
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// Vertex AI region
    #[arg(short, long, global = true)]
    pub region: Option<String>,

    /// Service account key file
    #[arg(short = 'k', long, global = true)]
    pub key_file: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format
    #[arg(short = 'f', long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute the node over a batch of items
    Run(RunArgs),
    /// Print the requests the node would send without calling the API
    Preview(NodeArgs),
    /// List known models and regions
    Models,
}

/// Node parameters and input items
#[derive(Args, Debug, Clone)]
pub struct NodeArgs {
    /// Node parameters file (YAML or JSON)
    #[arg(short, long)]
    pub node: PathBuf,

    /// Input items file (JSON array); a single empty item when omitted
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub node: NodeArgs,

    /// Record failed items in the output instead of aborting
    #[arg(long)]
    pub continue_on_fail: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
    Jsonl,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}
