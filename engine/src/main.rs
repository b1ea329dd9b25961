//! Poultry Ledger - command line front end
//!
//! Imports and exports spreadsheet data, prints cage and analytics reports as
//! JSON, and takes or restores full backups of the local data file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use poultry_ledger::config::Config;
use poultry_ledger::error::AppError;
use poultry_ledger::services::backup::BackupDocument;
use poultry_ledger::services::csv_export::ExportFile;
use poultry_ledger::services::csv_import::ImportOptions;
use poultry_ledger::services::{
    AnalyticsService, BackupService, CageDetailService, CsvExportService, CsvImportService,
};
use poultry_ledger::storage::{FileStore, Store};
use shared::csv_text::EntityKind;
use shared::types::{DateRange, MissingReferencePolicy};

#[derive(Parser)]
#[command(name = "poultry-ledger")]
#[command(about = "Layer farm production ledger", long_about = None)]
struct Cli {
    /// Data file to use instead of the configured one
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV file
    Import {
        /// production-logs, sales, expenses or feed-logs
        entity: EntityKind,

        file: PathBuf,

        /// Fail rows naming an unknown cycle or cage instead of creating them
        #[arg(long)]
        reject_missing: bool,
    },

    /// Export stored records
    Export {
        entity: EntityKind,

        /// Only records of this cycle
        #[arg(long)]
        cycle: Option<i64>,

        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,

        /// Write the file into this directory instead of printing it
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print an import template
    Template {
        entity: EntityKind,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show one cage with its metrics
    Cage { id: i64 },

    /// Print the analytics report
    Analytics {
        #[arg(long)]
        cycle: Option<i64>,

        /// Only look at the last N days
        #[arg(long, conflicts_with = "all")]
        days: Option<u32>,

        /// Look at every log
        #[arg(long)]
        all: bool,

        /// Limit the KPIs and charts to one cage
        #[arg(long)]
        cage: Option<i64>,

        /// Write the analytics export document into this directory
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Write a full backup
    Backup {
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Only export cycle definitions
        #[arg(long)]
        cycles_only: bool,
    },

    /// Restore a full backup
    Restore {
        file: PathBuf,

        /// Empty every collection before restoring
        #[arg(long)]
        replace: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    init_tracing(&config);

    let data_file = cli
        .data_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.storage.data_file));
    tracing::debug!(environment = %config.environment, data_file = %data_file.display(), "Starting");
    let store: Arc<dyn Store> = Arc::new(
        FileStore::open(&data_file)
            .await
            .with_context(|| format!("opening {}", data_file.display()))?,
    );

    if let Err(err) = run(cli.command, &config, store).await {
        if let Some(report) = error_report(&err) {
            eprintln!("{}", report);
            std::process::exit(1);
        }
        return Err(err);
    }
    Ok(())
}

/// Service failures print as a coded JSON report with a `retryable` flag
fn error_report(err: &anyhow::Error) -> Option<String> {
    let app_error = err.downcast_ref::<AppError>()?;
    serde_json::to_string_pretty(&app_error.to_response()).ok()
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "poultry_ledger=info".into());
    // Logs go to stderr so stdout stays clean for JSON and CSV output
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(command: Commands, config: &Config, store: Arc<dyn Store>) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();

    match command {
        Commands::Import {
            entity,
            file,
            reject_missing,
        } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let policy = if reject_missing {
                MissingReferencePolicy::Reject
            } else {
                config.import.missing_reference_policy
            };
            let options = ImportOptions {
                policy,
                default_cage_capacity: config.import.default_cage_capacity,
                default_breed: config.import.default_breed.clone(),
            };
            let results = CsvImportService::new(store)
                .with_options(options)
                .import(entity, &text)
                .await?;
            print_json(&results)?;
        }

        Commands::Export {
            entity,
            cycle,
            format,
            out,
        } => {
            let service = CsvExportService::new(store);
            let file = match format {
                Format::Csv => service.export_csv(entity, cycle, today).await?,
                Format::Json => service.export_json(entity, cycle, today).await?,
            };
            emit(file, out.as_deref()).await?;
        }

        Commands::Template { entity, out } => {
            emit(CsvExportService::template(entity), out.as_deref()).await?;
        }

        Commands::Cage { id } => {
            let detail = CageDetailService::new(store).load(id).await?;
            print_json(&detail)?;
        }

        Commands::Analytics {
            cycle,
            days,
            all,
            cage,
            export,
        } => {
            let service = AnalyticsService::new(store)
                .with_default_range(DateRange::LastDays(config.analytics.date_range_days));
            let mut filter = service.default_filter(today).with_cage(cage);
            if all {
                filter = filter.with_range(DateRange::All);
            } else if let Some(days) = days {
                filter = filter.with_range(DateRange::LastDays(days));
            }

            match export {
                Some(dir) => {
                    let (file_name, document) = service.export(cycle, Utc::now()).await?;
                    let content = serde_json::to_string_pretty(&document)?;
                    emit(ExportFile { file_name, content }, Some(&dir)).await?;
                }
                None => print_json(&service.report(cycle, filter).await?)?,
            }
        }

        Commands::Backup { out, cycles_only } => {
            let service = BackupService::new(store);
            let (file_name, content) = if cycles_only {
                let (name, export) = service.export_cycles(Utc::now()).await?;
                (name, serde_json::to_string_pretty(&export)?)
            } else {
                let (name, document) = service.export_all(Utc::now()).await?;
                (name, serde_json::to_string_pretty(&document)?)
            };
            emit(ExportFile { file_name, content }, Some(&out)).await?;
        }

        Commands::Restore { file, replace } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let document: BackupDocument =
                serde_json::from_slice(&bytes).context("backup file is not a valid backup document")?;
            let counts = BackupService::new(store).restore(document, replace).await?;
            let by_store: std::collections::BTreeMap<&str, usize> =
                counts.into_iter().map(|(c, n)| (c.store_name(), n)).collect();
            print_json(&by_store)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the file, or write it under its own name into `dir`
async fn emit(file: ExportFile, dir: Option<&Path>) -> anyhow::Result<()> {
    match dir {
        Some(dir) => {
            tokio::fs::create_dir_all(dir).await?;
            let path = dir.join(&file.file_name);
            tokio::fs::write(&path, file.content).await?;
            tracing::info!(path = %path.display(), "Wrote file");
            eprintln!("{}", path.display());
        }
        None => println!("{}", file.content),
    }
    Ok(())
}
