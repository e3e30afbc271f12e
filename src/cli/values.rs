//! Values subcommand for task-view CLI

use clap::Args;
use std::path::PathBuf;

/// Arguments for the values subcommand
#[derive(Args, Debug)]
pub struct ValuesArgs {
    /// Task list file (JSON array or YAML list)
    #[arg(short, long, value_name = "FILE")]
    pub tasks: PathBuf,

    /// Property name: status, priority, tags, contexts or projects
    #[arg(short, long)]
    pub property: String,

    /// Output format: json or markdown
    #[arg(short, long, default_value = "markdown")]
    pub format: String,
}
