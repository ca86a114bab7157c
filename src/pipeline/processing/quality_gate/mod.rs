use crate::constants::{AGE, BILLING_AMOUNT, ROOM_NUMBER};
use crate::error::{MigrationError, Result};
use crate::pipeline::processing::normalize::{parse_decimal, parse_integer};
use crate::types::{Dataset, Diagnostic, ValidationIssue};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// Advisory findings of the validation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub rows_checked: usize,
    /// Missing cells per required column; columns without gaps are listed with 0
    pub missing_by_column: BTreeMap<String, usize>,
    /// Source lines holding a non-numeric or out-of-domain numeric value
    pub invalid_numeric_lines: Vec<u64>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn total_missing(&self) -> usize {
        self.missing_by_column.values().sum()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

/// Numeric domain a column must respect
#[derive(Debug, Clone, Copy)]
enum NumericRule {
    /// Whole number no smaller than the bound
    IntegerAtLeast(i64),
    /// Any finite decimal
    FiniteDecimal,
}

const NUMERIC_RULES: [(&str, NumericRule); 3] = [
    (AGE, NumericRule::IntegerAtLeast(0)),
    (BILLING_AMOUNT, NumericRule::FiniteDecimal),
    (ROOM_NUMBER, NumericRule::IntegerAtLeast(0)),
];

/// Checks the loaded dataset before anything is transformed.
///
/// Only a missing required column is fatal. Empty cells and bad numbers are
/// collected into the report and the run carries on.
pub struct QualityGate<'a> {
    required_columns: &'a [String],
}

impl<'a> QualityGate<'a> {
    pub fn new(required_columns: &'a [String]) -> Self {
        Self { required_columns }
    }

    /// Fails with [`MigrationError::Schema`] naming every absent required column.
    pub fn check_schema(&self, dataset: &Dataset) -> Result<()> {
        let missing: Vec<String> = self
            .required_columns
            .iter()
            .filter(|c| !dataset.has_column(c))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MigrationError::Schema { missing })
        }
    }

    #[instrument(skip_all, fields(rows = dataset.len()))]
    pub fn assess(&self, dataset: &Dataset) -> Result<ValidationReport> {
        self.check_schema(dataset)?;
        info!("   Columns: {:?}", dataset.headers);

        let mut report = ValidationReport {
            rows_checked: dataset.len(),
            ..ValidationReport::default()
        };

        // Schema check passed, so every lookup resolves
        let required: Vec<(&str, usize)> = self
            .required_columns
            .iter()
            .filter_map(|c| dataset.column_index(c).map(|i| (c.as_str(), i)))
            .collect();
        for (column, _) in &required {
            report.missing_by_column.insert(column.to_string(), 0);
        }

        let numeric: Vec<(&str, usize, NumericRule)> = NUMERIC_RULES
            .iter()
            .filter_map(|(column, rule)| dataset.column_index(column).map(|i| (*column, i, *rule)))
            .collect();

        for row in &dataset.rows {
            for (column, index) in &required {
                if dataset.cell(row, *index).is_none() {
                    *report.missing_by_column.entry(column.to_string()).or_default() += 1;
                    report.warnings.push(Diagnostic::Validation {
                        line: row.line,
                        column: column.to_string(),
                        issue: ValidationIssue::MissingValue,
                    });
                }
            }

            let mut numeric_ok = true;
            for (column, index, rule) in &numeric {
                let Some(raw) = dataset.cell(row, *index) else {
                    continue;
                };
                if let Some(issue) = check_numeric(raw, *rule) {
                    numeric_ok = false;
                    report.warnings.push(Diagnostic::Validation {
                        line: row.line,
                        column: column.to_string(),
                        issue,
                    });
                }
            }
            if !numeric_ok {
                report.invalid_numeric_lines.push(row.line);
            }
        }

        info!("   Missing values: {}", report.total_missing());
        if !report.invalid_numeric_lines.is_empty() {
            warn!(
                "{} rows hold out-of-domain numeric values",
                report.invalid_numeric_lines.len()
            );
        }

        Ok(report)
    }
}

fn check_numeric(raw: &str, rule: NumericRule) -> Option<ValidationIssue> {
    match rule {
        NumericRule::IntegerAtLeast(min) => match parse_integer(raw) {
            None => Some(ValidationIssue::NotANumber { value: raw.to_string() }),
            Some(v) if v < min => Some(ValidationIssue::OutOfRange {
                value: raw.to_string(),
                constraint: format!(">= {min}"),
            }),
            Some(_) => None,
        },
        NumericRule::FiniteDecimal => match parse_decimal(raw) {
            None => Some(ValidationIssue::NotANumber { value: raw.to_string() }),
            Some(_) => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawRow;
    use std::path::PathBuf;

    fn dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset {
            path: PathBuf::from("mem.csv"),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, values)| RawRow {
                    line: i as u64 + 2,
                    values: values.iter().map(|v| v.to_string()).collect(),
                })
                .collect(),
        }
    }

    fn required(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn missing_required_column_fails_with_schema_error() {
        let data = dataset(&["Name", "Gender"], &[&["A", "Male"]]);
        let columns = required(&["Name", "Age", "Gender", "Hospital"]);

        let err = QualityGate::new(&columns).assess(&data).unwrap_err();
        match err {
            MigrationError::Schema { missing } => assert_eq!(missing, vec!["Age", "Hospital"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn empty_cells_are_counted_per_column_not_fatal() {
        let data = dataset(
            &["Name", "Age", "Hospital"],
            &[&["A", "30", ""], &["", "41", "NaN"], &["C", "52", "Kim Inc"]],
        );
        let columns = required(&["Name", "Age", "Hospital"]);

        let report = QualityGate::new(&columns).assess(&data).unwrap();
        assert_eq!(report.rows_checked, 3);
        assert_eq!(report.missing_by_column["Hospital"], 2);
        assert_eq!(report.missing_by_column["Name"], 1);
        assert_eq!(report.missing_by_column["Age"], 0);
        assert_eq!(report.total_missing(), 3);
        assert!(report.invalid_numeric_lines.is_empty());
    }

    #[test]
    fn negative_age_is_flagged_with_its_line() {
        let data = dataset(&["Name", "Age"], &[&["A", "30"], &["B", "-5"]]);
        let columns = required(&["Name", "Age"]);

        let report = QualityGate::new(&columns).assess(&data).unwrap();
        assert_eq!(report.invalid_numeric_lines, vec![3]);
        assert_eq!(
            report.warnings,
            vec![Diagnostic::Validation {
                line: 3,
                column: "Age".to_string(),
                issue: ValidationIssue::OutOfRange {
                    value: "-5".to_string(),
                    constraint: ">= 0".to_string()
                },
            }]
        );
    }

    #[test]
    fn non_numeric_values_are_reported() {
        let data = dataset(
            &["Age", "Billing Amount", "Room Number"],
            &[&["thirty", "12.5", "101"], &["40", "lots", "12B"]],
        );
        let columns = required(&["Age"]);

        let report = QualityGate::new(&columns).assess(&data).unwrap();
        assert_eq!(report.invalid_numeric_lines, vec![2, 3]);
        assert_eq!(report.warning_count(), 3);
    }

    #[test]
    fn negative_billing_amount_is_accepted() {
        let data = dataset(&["Billing Amount"], &[&["-502.51"]]);
        let columns = required(&["Billing Amount"]);

        let report = QualityGate::new(&columns).assess(&data).unwrap();
        assert!(report.warnings.is_empty());
    }
}
