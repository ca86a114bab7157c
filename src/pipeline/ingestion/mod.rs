// Pipeline ingestion: reads the source CSV into memory

use crate::error::{MigrationError, Result};
use crate::types::{Dataset, RawRow};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Reads the whole CSV file at `path`.
///
/// Every row must have as many fields as the header; anything else is a
/// malformed file and fails the load.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_csv(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        return Err(MigrationError::FileNotFound(path.to_path_buf()));
    }

    let load_err = |message: String| MigrationError::Load {
        path: path.to_path_buf(),
        message,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .map_err(|e| load_err(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| load_err(format!("unreadable header row: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(load_err("no header row".to_string()));
    }
    debug!("CSV headers: {:?}", headers);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| load_err(e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or(rows.len() as u64 + 2);
        rows.push(RawRow {
            line,
            values: record.iter().map(str::to_string).collect(),
        });
    }

    info!("✅ {} records loaded from {} columns", rows.len(), headers.len());

    Ok(Dataset {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_rows_in_order_with_headers() {
        let file = write_csv("Name,Age,Hospital\nBobby Jackson,30,Sons and Miller\nLeslie Terry,62,Kim Inc\n");
        let dataset = load_csv(file.path()).unwrap();

        assert_eq!(dataset.headers, vec!["Name", "Age", "Hospital"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows[0].values[0], "Bobby Jackson");
        assert_eq!(dataset.rows[0].line, 2);
        assert_eq!(dataset.rows[1].line, 3);
        assert_eq!(dataset.rows[1].values[2], "Kim Inc");
    }

    #[test]
    fn quoted_fields_keep_embedded_commas() {
        let file = write_csv("Name,Hospital\n\"Smith, Jr.\",\"Williams, Brown and Co\"\n");
        let dataset = load_csv(file.path()).unwrap();
        assert_eq!(dataset.rows[0].values, vec!["Smith, Jr.", "Williams, Brown and Co"]);
    }

    #[test]
    fn strips_utf8_bom_from_first_header() {
        let file = write_csv("\u{feff}Name,Age\nA,1\n");
        let dataset = load_csv(file.path()).unwrap();
        assert!(dataset.has_column("Name"));
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = load_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, MigrationError::FileNotFound(_)));
    }

    #[test]
    fn ragged_rows_are_a_load_error() {
        let file = write_csv("Name,Age\nA,1\nB,2,extra\n");
        let err = load_csv(file.path()).unwrap_err();
        assert!(matches!(err, MigrationError::Load { .. }));
    }

    #[test]
    fn empty_file_is_a_load_error() {
        let file = write_csv("");
        let err = load_csv(file.path()).unwrap_err();
        assert!(matches!(err, MigrationError::Load { .. }));
    }

    #[test]
    fn non_utf8_content_is_a_load_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"Name,Age\n\xff\xfe,30\n").unwrap();
        file.flush().unwrap();

        let err = load_csv(file.path()).unwrap_err();
        assert!(matches!(err, MigrationError::Load { .. }));
    }
}
