//! Agenda subcommand for task-view CLI

use clap::Args;
use std::path::PathBuf;

/// Arguments for the agenda subcommand
#[derive(Args, Debug)]
pub struct AgendaArgs {
    /// Task list file (JSON array or YAML list)
    #[arg(short, long, value_name = "FILE")]
    pub tasks: PathBuf,

    /// First day of the agenda (YYYY-MM-DD, or words like "today")
    #[arg(short, long, value_name = "DATE")]
    pub date: String,

    /// Number of consecutive days to include
    #[arg(long, default_value_t = 1)]
    pub days: u32,

    /// Include overdue tasks when the agenda starts today
    #[arg(long)]
    pub overdue: bool,

    /// Base query narrowing the agenda (inline JSON or file)
    #[arg(short, long, value_name = "QUERY")]
    pub query: Option<String>,

    /// Output format: json or markdown
    #[arg(short, long, default_value = "markdown")]
    pub format: String,
}
