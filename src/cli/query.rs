//! Query subcommand for task-view CLI
//!
//! Loads a task list and a filter query, then prints the grouped results.

use crate::query::FilterQuery;
use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the query subcommand
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Task list file (JSON array or YAML list)
    #[arg(short, long, value_name = "FILE")]
    pub tasks: PathBuf,

    /// Query as inline JSON or a path to a JSON/YAML file
    #[arg(short, long, value_name = "QUERY")]
    pub query: String,

    /// Reference date for recurring tasks (default: today)
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,

    /// Output format: json or markdown
    #[arg(short, long, default_value = "json")]
    pub format: String,

    /// Disable index pruning
    #[arg(long)]
    pub full_scan: bool,
}

impl QueryArgs {
    pub fn load_query(&self) -> Result<FilterQuery> {
        load_query(&self.query)
    }
}

/// Parse a query given inline or by file path.
pub fn load_query(source: &str) -> Result<FilterQuery> {
    let trimmed = source.trim_start();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).context("parsing inline query");
    }

    let path = Path::new(source);
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading query from {}", path.display()))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("parsing query in {}", path.display())),
        _ => serde_json::from_str(&content)
            .with_context(|| format!("parsing query in {}", path.display())),
    }
}
