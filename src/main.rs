use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use patient_migrator::config::{AuditTimestamps, MigrationConfig, WriteMode};
use patient_migrator::{logging, MigrationError, MigrationPipeline, RunSummary};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "patient_migrator")]
#[command(about = "Migrates the healthcare patient CSV dataset into MongoDB")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// TOML configuration file (defaults to ./migration.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// CSV file to migrate
    #[arg(long)]
    input: Option<PathBuf>,
    /// Also write the run summary as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full migration into MongoDB
    Migrate {
        #[command(flatten)]
        source: SourceArgs,
        /// MongoDB connection string
        #[arg(long)]
        uri: Option<String>,
        #[arg(long)]
        database: Option<String>,
        #[arg(long)]
        collection: Option<String>,
        /// Delete existing documents in the collection before inserting
        #[arg(long)]
        replace: bool,
        /// Stamp each document when it is transformed instead of at run start
        #[arg(long)]
        per_record_timestamps: bool,
    },
    /// Load, validate, transform and detect duplicates without writing
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },
}

fn load_config(source: &SourceArgs) -> Result<MigrationConfig> {
    let mut config = MigrationConfig::load(source.config.as_deref()).context("loading configuration")?;
    if let Some(input) = &source.input {
        config.input_path = input.clone();
    }
    Ok(config)
}

/// Tags a pipeline failure with the stage that aborted the run.
fn stage_failure(e: MigrationError) -> anyhow::Error {
    let stage = e.stage();
    anyhow::Error::new(e).context(format!("{stage} stage failed"))
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 Migration summary (run {}):", summary.run_id);
    println!("   Input: {}", summary.input_path.display());
    println!("   Records loaded: {}", summary.records_loaded);
    println!("   Validation warnings: {}", summary.validation_warnings());
    println!("   Transform warnings: {}", summary.transform_warnings());
    println!("   Date parse failures: {}", summary.date_parse_failures);
    println!("   Duplicates found: {}", summary.duplicates.duplicate_count);
    match &summary.write {
        Some(write) => {
            if let Some(cleared) = write.cleared {
                println!("   Previous documents removed: {}", cleared);
            }
            println!(
                "   Inserted: {} documents into {}.{}",
                write.inserted, summary.database, summary.collection
            );
            println!("   Indexes: {}", write.indexes.join(", "));
            println!("   Collection now holds: {} documents", write.collection_count);
        }
        None => println!("   Dry run: nothing written"),
    }

    let missing: Vec<String> = summary
        .missing_by_column
        .iter()
        .filter(|(_, n)| **n > 0)
        .map(|(column, n)| format!("{column}={n}"))
        .collect();
    if !missing.is_empty() {
        println!("   Missing values: {}", missing.join(", "));
    }

    const SHOWN: usize = 10;
    if !summary.diagnostics.is_empty() {
        println!("\n⚠️  Warnings (first {}):", SHOWN.min(summary.diagnostics.len()));
        for diagnostic in summary.diagnostics.iter().take(SHOWN) {
            println!("   - {}", diagnostic);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Migrate {
            source,
            uri,
            database,
            collection,
            replace,
            per_record_timestamps,
        } => {
            println!("🚀 Running migration...");
            let mut config = load_config(&source)?;
            if let Some(uri) = uri {
                config.connection_uri = uri;
            }
            if let Some(database) = database {
                config.database_name = database;
            }
            if let Some(collection) = collection {
                config.collection_name = collection;
            }
            if replace {
                config.write_mode = WriteMode::Replace;
            }
            if per_record_timestamps {
                config.audit_timestamps = AuditTimestamps::PerRecord;
            }

            let pipeline = MigrationPipeline::new(config).map_err(stage_failure)?;
            let summary = pipeline.run().await.map_err(stage_failure)?;
            print_summary(&summary);
            if let Some(path) = &source.summary_json {
                summary.persist_to_json(path).map_err(stage_failure)?;
                info!("💾 Saved run summary to {}", path.display());
            }
            println!("🎉 Migration completed successfully!");
        }
        Commands::Check { source } => {
            println!("🔍 Checking input without writing...");
            let config = load_config(&source)?;
            let pipeline = MigrationPipeline::new(config).map_err(stage_failure)?;
            let summary = pipeline.check().map_err(stage_failure)?;
            print_summary(&summary);
            if let Some(path) = &source.summary_json {
                summary.persist_to_json(path).map_err(stage_failure)?;
                info!("💾 Saved run summary to {}", path.display());
            }
            if summary.validation_warnings() > 0 {
                warn!("{} validation warnings", summary.validation_warnings());
            }
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _guard = logging::init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Migration failed: {:#}", e);
            println!("❌ Migration failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
