// Migration pipeline: ingestion, processing, and storage

pub mod ingestion;
pub mod orchestrator;
pub mod processing;
pub mod storage;

pub use orchestrator::{MigrationPipeline, RunSummary, WriteOutcome};
