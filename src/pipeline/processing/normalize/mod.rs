use crate::config::AuditTimestamps;
use crate::constants::{self, PATIENT_COLUMNS, PATIENT_COLUMN_COUNT};
use crate::types::{Dataset, Diagnostic, FieldValue, PatientRecord, RawRow, TransformIssue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a calendar date; a time part, if any, is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Parses a whole number. `"30.0"` is accepted, `"30.5"` is not.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64)
            .map(|v| v as i64)
    })
}

/// Parses a finite decimal.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Typed records plus the per-row findings of the transform pass
#[derive(Debug, Clone, Serialize)]
pub struct TransformOutput {
    #[serde(skip)]
    pub records: Vec<PatientRecord>,
    pub date_parse_failures: usize,
    pub warnings: Vec<Diagnostic>,
}

/// Column positions resolved once per dataset
struct ColumnMap {
    known: [Option<usize>; PATIENT_COLUMN_COUNT],
    extra: Vec<(String, usize)>,
}

impl ColumnMap {
    fn resolve(dataset: &Dataset) -> Self {
        let mut known = [None; PATIENT_COLUMN_COUNT];
        for (slot, column) in known.iter_mut().zip(PATIENT_COLUMNS.iter()) {
            *slot = dataset.column_index(column);
        }
        let extra = dataset
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !PATIENT_COLUMNS.contains(&h.as_str()))
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Self { known, extra }
    }

    fn index(&self, column: &str) -> Option<usize> {
        PATIENT_COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|slot| self.known[slot])
    }
}

/// Turns validated raw rows into typed patient records.
///
/// Bad cells never fail the run: the field is stored as null and a
/// [`TransformIssue`] is recorded against the row.
pub struct Normalizer {
    run_started_at: DateTime<Utc>,
    audit_timestamps: AuditTimestamps,
}

impl Normalizer {
    pub fn new(run_started_at: DateTime<Utc>, audit_timestamps: AuditTimestamps) -> Self {
        Self {
            run_started_at,
            audit_timestamps,
        }
    }

    #[instrument(skip_all, fields(rows = dataset.len()))]
    pub fn normalize(&self, dataset: &Dataset) -> TransformOutput {
        let columns = ColumnMap::resolve(dataset);
        let mut out = TransformOutput {
            records: Vec::with_capacity(dataset.len()),
            date_parse_failures: 0,
            warnings: Vec::new(),
        };

        for row in &dataset.rows {
            let record = self.normalize_row(dataset, &columns, row, &mut out);
            out.records.push(record);
        }

        if out.date_parse_failures > 0 {
            warn!("{} date values could not be parsed and were stored as null", out.date_parse_failures);
        }
        info!("✅ {} documents ready", out.records.len());
        out
    }

    fn normalize_row(
        &self,
        dataset: &Dataset,
        columns: &ColumnMap,
        row: &RawRow,
        out: &mut TransformOutput,
    ) -> PatientRecord {
        let cell = |column: &str| columns.index(column).and_then(|i| dataset.cell(row, i));
        let text = |column: &str| cell(column).map(str::to_string);

        let mut date = |column: &str| -> FieldValue<NaiveDate> {
            // An absent optional column is not a per-row problem
            if columns.index(column).is_none() {
                return FieldValue::Missing;
            }
            match cell(column) {
                None => {
                    out.warnings.push(Diagnostic::Transform {
                        line: row.line,
                        column: column.to_string(),
                        issue: TransformIssue::MissingDate,
                    });
                    FieldValue::Missing
                }
                Some(raw) => match parse_date(raw) {
                    Some(d) => FieldValue::Present(d),
                    None => {
                        debug!(line = row.line, column, raw, "unparsable date");
                        out.date_parse_failures += 1;
                        out.warnings.push(Diagnostic::Transform {
                            line: row.line,
                            column: column.to_string(),
                            issue: TransformIssue::UnparsableDate { value: raw.to_string() },
                        });
                        FieldValue::Invalid(raw.to_string())
                    }
                },
            }
        };
        let date_of_admission = date(constants::DATE_OF_ADMISSION);
        let discharge_date = date(constants::DISCHARGE_DATE);

        let age = typed_number(cell(constants::AGE), parse_integer);
        let billing_amount = typed_number(cell(constants::BILLING_AMOUNT), parse_decimal);
        let room_number = typed_number(cell(constants::ROOM_NUMBER), parse_integer);

        let stamp = match self.audit_timestamps {
            AuditTimestamps::RunStart => self.run_started_at,
            AuditTimestamps::PerRecord => Utc::now(),
        };

        PatientRecord {
            line: row.line,
            name: text(constants::NAME),
            age,
            gender: text(constants::GENDER),
            blood_type: text(constants::BLOOD_TYPE),
            medical_condition: text(constants::MEDICAL_CONDITION),
            date_of_admission,
            doctor: text(constants::DOCTOR),
            hospital: text(constants::HOSPITAL),
            insurance_provider: text(constants::INSURANCE_PROVIDER),
            billing_amount,
            room_number,
            admission_type: text(constants::ADMISSION_TYPE),
            discharge_date,
            medication: text(constants::MEDICATION),
            test_results: text(constants::TEST_RESULTS),
            extra: columns
                .extra
                .iter()
                .map(|(name, i)| (name.clone(), dataset.cell(row, *i).map(str::to_string)))
                .collect(),
            created_at: stamp,
            updated_at: stamp,
        }
    }
}

/// Non-numeric text is kept as `Invalid` and stored as null. The validation
/// pass already reported it, so no transform diagnostic is added.
fn typed_number<T>(raw: Option<&str>, parse: fn(&str) -> Option<T>) -> FieldValue<T> {
    match raw {
        None => FieldValue::Missing,
        Some(raw) => parse(raw).map_or_else(|| FieldValue::Invalid(raw.to_string()), FieldValue::Present),
    }
}
