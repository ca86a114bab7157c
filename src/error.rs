use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to load '{}': {message}", .path.display())]
    Load { path: PathBuf, message: String },

    #[error("Required columns missing from input: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Bulk write rejected: {message}")]
    Write { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    /// Pipeline stage the error aborted.
    pub fn stage(&self) -> &'static str {
        match self {
            MigrationError::FileNotFound(_) | MigrationError::Load { .. } => "load",
            MigrationError::Schema { .. } => "validate",
            MigrationError::Connection { .. } | MigrationError::Write { .. } => "write",
            MigrationError::Config(_) | MigrationError::Toml(_) => "config",
            MigrationError::Json(_) | MigrationError::Io(_) => "report",
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_every_missing_column() {
        let err = MigrationError::Schema {
            missing: vec!["Age".to_string(), "Hospital".to_string()],
        };
        assert_eq!(err.to_string(), "Required columns missing from input: Age, Hospital");
        assert_eq!(err.stage(), "validate");
    }

    #[test]
    fn fatal_kinds_map_to_their_stage() {
        assert_eq!(MigrationError::FileNotFound(PathBuf::from("x.csv")).stage(), "load");
        assert_eq!(
            MigrationError::Connection { message: "refused".into() }.stage(),
            "write"
        );
        assert_eq!(MigrationError::Write { message: "dup key".into() }.stage(), "write");
    }
}
