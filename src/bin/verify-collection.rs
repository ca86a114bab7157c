use anyhow::{Context, Result};
use clap::Parser;
use patient_migrator::config::MigrationConfig;
use patient_migrator::pipeline::storage::{MongoStore, PatientStore};
use std::path::PathBuf;

/// Prints what the last migration left in the target collection.
#[derive(Parser)]
#[command(name = "verify-collection")]
#[command(about = "Reports document count, indexes and a sample document of the patient collection")]
struct Args {
    /// TOML configuration file (defaults to ./migration.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// MongoDB connection string
    #[arg(long)]
    uri: Option<String>,
    #[arg(long)]
    database: Option<String>,
    #[arg(long)]
    collection: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = MigrationConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(uri) = args.uri {
        config.connection_uri = uri;
    }
    if let Some(database) = args.database {
        config.database_name = database;
    }
    if let Some(collection) = args.collection {
        config.collection_name = collection;
    }
    config.validate()?;

    println!(
        "🔍 Verifying {}.{}...",
        config.database_name, config.collection_name
    );
    let store = MongoStore::connect(&config).await?;

    let report = async {
        let count = store.count().await?;
        let indexes = store.index_names().await?;
        let sample = store.sample().await?;
        Ok::<_, patient_migrator::MigrationError>((count, indexes, sample))
    }
    .await;
    store.close().await;
    let (count, indexes, sample) = report?;

    println!("   Documents: {}", count);
    println!("   Indexes ({}): {}", indexes.len(), indexes.join(", "));
    match sample {
        Some(doc) => println!("   Sample: {}", doc),
        None => println!("   Collection is empty"),
    }
    Ok(())
}
