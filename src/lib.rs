pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod types;

pub use config::MigrationConfig;
pub use error::{MigrationError, Result};
pub use pipeline::{MigrationPipeline, RunSummary};
