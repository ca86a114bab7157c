use crate::config::{MigrationConfig, WriteMode};
use crate::constants::{AGE, NAME};
use crate::error::{MigrationError, Result};
use crate::pipeline::ingestion::load_csv;
use crate::pipeline::processing::dedupe::{detect_duplicates, DuplicateReport};
use crate::pipeline::processing::normalize::Normalizer;
use crate::pipeline::processing::quality_gate::QualityGate;
use crate::pipeline::storage::{MongoStore, PatientStore};
use crate::types::{Diagnostic, PatientRecord};
use chrono::{DateTime, Utc};
use mongodb::bson::Document;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// What the write phase did to the target collection
#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcome {
    pub mode: WriteMode,
    /// Documents removed before inserting (replace mode only)
    pub cleared: Option<u64>,
    pub inserted: usize,
    pub indexes: Vec<String>,
    /// Documents in the collection once the run finished
    pub collection_count: u64,
}

/// Result of a complete migration run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_path: PathBuf,
    pub database: String,
    pub collection: String,
    pub records_loaded: usize,
    pub missing_by_column: BTreeMap<String, usize>,
    pub invalid_numeric_lines: Vec<u64>,
    pub date_parse_failures: usize,
    /// Every non-fatal finding, validation first, then transform
    pub diagnostics: Vec<Diagnostic>,
    pub duplicates: DuplicateReport,
    /// None for a dry run
    pub write: Option<WriteOutcome>,
}

impl RunSummary {
    pub fn validation_warnings(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::Validation { .. }))
            .count()
    }

    pub fn transform_warnings(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::Transform { .. }))
            .count()
    }

    pub fn inserted(&self) -> usize {
        self.write.as_ref().map_or(0, |w| w.inserted)
    }

    /// Writes the summary as pretty JSON.
    pub fn persist_to_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Output of every stage that runs before the database is touched
struct PreparedRun {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    records: Vec<PatientRecord>,
    missing_by_column: BTreeMap<String, usize>,
    invalid_numeric_lines: Vec<u64>,
    date_parse_failures: usize,
    diagnostics: Vec<Diagnostic>,
    duplicates: DuplicateReport,
}

/// Load → validate → transform → detect duplicates → write → index, strictly
/// in that order over the whole in-memory dataset.
pub struct MigrationPipeline {
    config: MigrationConfig,
}

impl MigrationPipeline {
    pub fn new(config: MigrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Runs the full migration against the configured MongoDB deployment.
    ///
    /// The connection is opened only after duplicate detection and is shut
    /// down whether the write phase succeeds or not.
    pub async fn run(&self) -> Result<RunSummary> {
        let prepared = self.prepare()?;

        let span = info_span!("write", run_id = %prepared.run_id);
        let store = MongoStore::connect(&self.config).instrument(span.clone()).await?;
        let outcome = self.write(&store, &prepared.records).instrument(span).await;
        store.close().await;

        Ok(self.summarize(prepared, Some(outcome?)))
    }

    /// Runs the full migration against an already opened store.
    pub async fn run_with_store<S: PatientStore + ?Sized>(&self, store: &S) -> Result<RunSummary> {
        let prepared = self.prepare()?;

        let span = info_span!("write", run_id = %prepared.run_id);
        let outcome = self.write(store, &prepared.records).instrument(span).await?;

        Ok(self.summarize(prepared, Some(outcome)))
    }

    /// Every stage up to, but not including, the write.
    pub fn check(&self) -> Result<RunSummary> {
        let prepared = self.prepare()?;
        Ok(self.summarize(prepared, None))
    }

    fn prepare(&self) -> Result<PreparedRun> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("migration", %run_id);
        let _enter = span.enter();

        info!("📂 Loading {}", self.config.input_path.display());
        let dataset = load_csv(&self.config.input_path)?;

        info!("🔍 Validating data...");
        let validation = QualityGate::new(&self.config.required_columns).assess(&dataset)?;

        info!("🔄 Transforming data...");
        let transform = Normalizer::new(started_at, self.config.audit_timestamps).normalize(&dataset);

        let duplicates = detect_duplicates(&transform.records);

        let mut diagnostics = validation.warnings;
        diagnostics.extend(transform.warnings);

        Ok(PreparedRun {
            run_id,
            started_at,
            records: transform.records,
            missing_by_column: validation.missing_by_column,
            invalid_numeric_lines: validation.invalid_numeric_lines,
            date_parse_failures: transform.date_parse_failures,
            diagnostics,
            duplicates,
        })
    }

    async fn write<S: PatientStore + ?Sized>(
        &self,
        store: &S,
        records: &[PatientRecord],
    ) -> Result<WriteOutcome> {
        let cleared = match self.config.write_mode {
            WriteMode::Replace => {
                let removed = store.clear().await?;
                info!("🗑️ {} previous documents removed", removed);
                Some(removed)
            }
            WriteMode::Append => None,
        };

        info!("💾 Inserting into {}...", self.config.collection_name);
        let documents: Vec<Document> = records.iter().map(PatientRecord::to_document).collect();
        let expected = documents.len();
        let inserted = if documents.is_empty() {
            warn!("No records to insert");
            0
        } else {
            store.insert_all(documents).await?
        };
        if inserted != expected {
            return Err(MigrationError::Write {
                message: format!("{inserted} of {expected} documents acknowledged"),
            });
        }
        info!("✅ {} documents inserted", inserted);

        info!("📇 Creating indexes...");
        let indexes = store.create_indexes(&self.config.index_fields).await?;
        info!("✅ Indexes created: {:?}", indexes);

        let collection_count = store.count().await?;
        info!("✅ Total in collection: {} documents", collection_count);
        if let Some(sample) = store.sample().await? {
            info!(
                "📄 Sample document: {}, age {}",
                sample.get_str(NAME).unwrap_or("<no name>"),
                sample.get(AGE).map(ToString::to_string).unwrap_or_default()
            );
        }

        Ok(WriteOutcome {
            mode: self.config.write_mode,
            cleared,
            inserted,
            indexes,
            collection_count,
        })
    }

    fn summarize(&self, prepared: PreparedRun, write: Option<WriteOutcome>) -> RunSummary {
        RunSummary {
            run_id: prepared.run_id,
            started_at: prepared.started_at,
            finished_at: Utc::now(),
            input_path: self.config.input_path.clone(),
            database: self.config.database_name.clone(),
            collection: self.config.collection_name.clone(),
            records_loaded: prepared.records.len(),
            missing_by_column: prepared.missing_by_column,
            invalid_numeric_lines: prepared.invalid_numeric_lines,
            date_parse_failures: prepared.date_parse_failures,
            diagnostics: prepared.diagnostics,
            duplicates: prepared.duplicates,
            write,
        }
    }
}
