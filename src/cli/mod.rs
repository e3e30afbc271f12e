//! CLI command definitions for task-view.
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod agenda;
pub mod query;
pub mod values;

use crate::format::OutputFormat;
use crate::query::dates::resolve_date_value;
use agenda::AgendaArgs;
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use query::QueryArgs;
use values::ValuesArgs;

/// Query task lists from the command line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a filter query and print grouped results
    Query(QueryArgs),

    /// List tasks falling on one or more dates
    Agenda(AgendaArgs),

    /// List the distinct values of a property
    Values(ValuesArgs),
}

/// Parse an output format argument.
pub fn parse_format(s: &str) -> Result<OutputFormat> {
    OutputFormat::parse(s).ok_or_else(|| anyhow!("unknown output format '{}'", s))
}

/// Parse a date argument, accepting the same words as query values.
pub fn parse_date(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    resolve_date_value(s, today)
        .map(|d| d.day)
        .ok_or_else(|| anyhow!("invalid date '{}'", s))
}
