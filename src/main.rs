#![allow(clippy::print_stdout)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use coffee_log_etl::config::AppConfig;
use coffee_log_etl::logging::init_logging;
use coffee_log_etl::notes::NoteParser;
use coffee_log_etl::notify::{now_in, FanoutNotifier, StatusFileNotifier, TracingNotifier};
use coffee_log_etl::source::{DirectorySource, ExportSource, FileSource};
use coffee_log_etl::{Pipeline, RunStatus};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, stage and merge one day's export
    Run {
        /// Export date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// Read this export file instead of the configured folder
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Load an export into the staging table without merging
    Stage {
        /// Export file to load
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Merge the current staging snapshot into the durable table
    Merge,
    /// Show how a note would be parsed
    ParseNote {
        /// Note text, e.g. "Bean: Kenya / Grind: 20"
        text: String,
    },
    /// Print the most recent durable log rows
    Show {
        /// Number of rows to print
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    let _guard = init_logging(
        Some(&config.get_log_level()),
        config.logging.file_path.as_deref().map(Path::new),
        config.logging.format == "json",
    )?;

    info!("Starting coffee-log-etl");

    // Parse command line arguments
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { date, file } => run(&config, date.as_deref(), file.as_deref()),
        Commands::Stage { file } => stage(&config, file),
        Commands::Merge => merge(&config),
        Commands::ParseNote { text } => parse_note(&config, text),
        Commands::Show { limit } => show(&config, *limit),
    }
}

fn local_offset(config: &AppConfig) -> Result<FixedOffset> {
    FixedOffset::east_opt(config.normalize.utc_offset_minutes * 60).context("utc_offset_minutes is out of range")
}

/// Run the full pipeline and exit non-zero when it failed
fn run(config: &AppConfig, date: Option<&str>, file: Option<&Path>) -> Result<()> {
    let offset = local_offset(config)?;
    let date = match date {
        Some(text) => {
            NaiveDate::parse_from_str(text, "%Y-%m-%d").with_context(|| format!("Invalid date '{text}', expected YYYY-MM-DD"))?
        }
        None => now_in(offset).date_naive(),
    };

    let source: Box<dyn ExportSource> = match file {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(DirectorySource::new(&config.source.directory, &config.source.file_stem)),
    };

    let mut notifier = FanoutNotifier::default().with(TracingNotifier::new(&config.notify.db_label));
    if let Some(status_file) = &config.notify.status_file {
        notifier = notifier.with(StatusFileNotifier::new(status_file, &config.notify.db_label, offset));
    }

    let mut pipeline = Pipeline::from_config(config)?;
    let summary = pipeline.run(source.as_ref(), date, &notifier);

    println!(
        "{}: read {}, skipped {}, staged {}, merged {}, warnings {}",
        summary.status.label(),
        summary.rows_read,
        summary.skipped,
        summary.staged,
        summary.merged,
        summary.warnings.len()
    );

    if let RunStatus::Failure { error } = summary.status {
        error!("Run failed: {error}");
        anyhow::bail!("run failed: {error}");
    }
    Ok(())
}

fn stage(config: &AppConfig, file: &Path) -> Result<()> {
    let offset = local_offset(config)?;
    let bytes = FileSource::new(file).fetch(now_in(offset).date_naive())?;

    let mut pipeline = Pipeline::from_config(config)?;
    let batch = pipeline.prepare(&bytes)?;
    for anomaly in &batch.skipped {
        println!("skipped: {anomaly}");
    }
    let staged = pipeline.stage(&batch)?;

    println!("Staged {staged} rows from {}", file.display());
    Ok(())
}

fn merge(config: &AppConfig) -> Result<()> {
    let mut pipeline = Pipeline::from_config(config)?;
    let merged = pipeline.merge()?;
    println!("Merged {merged} rows into {}", config.notify.db_label);
    Ok(())
}

fn parse_note(config: &AppConfig, text: &str) -> Result<()> {
    let parser = NoteParser::new(config.notes.delimiter)?;
    let attrs = parser.parse(text);
    println!("{}", serde_json::to_string_pretty(&attrs)?);
    Ok(())
}

fn show(config: &AppConfig, limit: usize) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let records = pipeline.database().durable_records(Some(limit))?;

    if records.is_empty() {
        println!("No brewing logs yet");
        return Ok(());
    }

    for record in records {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}
