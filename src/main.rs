//! task-view CLI
//!
//! Runs filter queries, agendas and value listings over a task list file.

use anyhow::Result;
use chrono::Duration;
use clap::Parser;
use std::sync::Arc;
use task_view_query::cli::agenda::AgendaArgs;
use task_view_query::cli::query::{QueryArgs, load_query};
use task_view_query::cli::values::ValuesArgs;
use task_view_query::cli::{Cli, Command, parse_date, parse_format};
use task_view_query::config::{CONFIG_PATH_ENV, Config, ConfigLoader};
use task_view_query::error::QueryError;
use task_view_query::format::{render_groups, render_tasks, render_values};
use task_view_query::logging::{LogTarget, init_tracing};
use task_view_query::provider::MemoryIndex;
use task_view_query::query::{FilterProperty, QueryEngine, default_query};
use task_view_query::recurrence::SimpleRecurrence;
use task_view_query::registry::{ConfiguredPriorities, ConfiguredStatuses};
use tracing::{Level, debug, info};

fn build_engine(config: &Config, tasks: &std::path::Path) -> Result<QueryEngine> {
    let index = MemoryIndex::load(tasks)?;
    info!("Loaded {} tasks from {}", index.len(), tasks.display());
    Ok(QueryEngine::new(
        Arc::new(index),
        Arc::new(ConfiguredStatuses::from_config(config)),
        Arc::new(ConfiguredPriorities::from_config(config)),
        Arc::new(SimpleRecurrence),
        config.engine.clone(),
    ))
}

async fn run_query(mut config: Config, args: QueryArgs) -> Result<String> {
    let format = parse_format(&args.format)?;
    if args.full_scan {
        config.engine.optimize = false;
    }
    let query = args.load_query()?;
    let engine = build_engine(&config, &args.tasks)?;
    let reference = match args.date {
        Some(ref date) => Some(parse_date(date, engine.today())?),
        None => None,
    };

    let groups = engine.get_grouped_results(&query, reference).await?;
    engine.shutdown();
    render_groups(&groups, &ConfiguredStatuses::from_config(&config), format)
}

async fn run_agenda(config: Config, args: AgendaArgs) -> Result<String> {
    let format = parse_format(&args.format)?;
    let base = match args.query {
        Some(ref source) => load_query(source)?,
        None => default_query(),
    };
    let engine = build_engine(&config, &args.tasks)?;
    let start = parse_date(&args.date, engine.today())?;

    let tasks = if args.days <= 1 {
        engine
            .get_results_for_date(start, &base, args.overdue)
            .await?
    } else {
        let dates: Vec<_> = (0..i64::from(args.days))
            .map(|offset| start + Duration::days(offset))
            .collect();
        engine.get_flat_results_for_dates(&dates, &base).await?
    };
    engine.shutdown();

    let heading = if args.days <= 1 {
        format!("Agenda {}", start)
    } else {
        format!("Agenda {} (+{} days)", start, args.days - 1)
    };
    render_tasks(&heading, &tasks, &ConfiguredStatuses::from_config(&config), format)
}

async fn run_values(config: Config, args: ValuesArgs) -> Result<String> {
    let format = parse_format(&args.format)?;
    let property = FilterProperty::parse(&args.property)
        .ok_or_else(|| QueryError::unknown_property(&args.property))?;
    let engine = build_engine(&config, &args.tasks)?;
    let values = engine.get_distinct_property_values(property).await?;
    engine.shutdown();
    render_values(property.as_str(), &values, format)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(level, &LogTarget::parse(&cli.log))?;

    // An explicit config path takes precedence over every tier.
    if let Some(config_path) = &cli.config {
        // SAFETY: set before any other threads read the environment.
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, config_path);
        }
    }
    let loader = ConfigLoader::load()?;
    for source in loader.sources() {
        debug!("Config source: {}", source.display());
    }
    let config = loader.into_config();

    let output = match cli.command {
        Command::Query(args) => run_query(config, args).await?,
        Command::Agenda(args) => run_agenda(config, args).await?,
        Command::Values(args) => run_values(config, args).await?,
    };
    println!("{}", output);
    Ok(())
}
