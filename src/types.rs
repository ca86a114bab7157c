use crate::constants::{self, is_null_cell};
use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::{self, Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One data row of the source file, exactly as read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based line number in the source file (the header is line 1)
    pub line: u64,
    pub values: Vec<String>,
}

/// The loaded source file: header plus every data row in file order
#[derive(Debug, Clone)]
pub struct Dataset {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Dataset {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Non-null cell value of `row` at `index`, trimmed.
    pub fn cell<'a>(&self, row: &'a RawRow, index: usize) -> Option<&'a str> {
        row.values
            .get(index)
            .map(String::as_str)
            .filter(|raw| !is_null_cell(raw))
            .map(str::trim)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A typed cell that may be absent from the source or fail to parse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue<T> {
    Present(T),
    Missing,
    /// Unparsable source text, kept verbatim
    Invalid(String),
}

impl<T> FieldValue<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            FieldValue::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, FieldValue::Present(_))
    }
}

impl<T: fmt::Display> FieldValue<T> {
    fn canonical(&self) -> String {
        match self {
            FieldValue::Present(v) => v.to_string(),
            FieldValue::Missing => String::new(),
            FieldValue::Invalid(raw) => format!("!{raw}"),
        }
    }
}

/// One patient admission event after type normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub line: u64,
    pub name: Option<String>,
    pub age: FieldValue<i64>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
    pub medical_condition: Option<String>,
    pub date_of_admission: FieldValue<NaiveDate>,
    pub doctor: Option<String>,
    pub hospital: Option<String>,
    pub insurance_provider: Option<String>,
    pub billing_amount: FieldValue<f64>,
    pub room_number: FieldValue<i64>,
    pub admission_type: Option<String>,
    pub discharge_date: FieldValue<NaiveDate>,
    pub medication: Option<String>,
    pub test_results: Option<String>,
    /// Source columns outside the known schema, in header order
    pub extra: Vec<(String, Option<String>)>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientRecord {
    /// Canonical text of every business field. Audit timestamps and the
    /// source line are not part of it.
    pub fn business_key(&self) -> String {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let mut parts = vec![
            text(&self.name),
            self.age.canonical(),
            text(&self.gender),
            text(&self.blood_type),
            text(&self.medical_condition),
            self.date_of_admission.canonical(),
            text(&self.doctor),
            text(&self.hospital),
            text(&self.insurance_provider),
            self.billing_amount.canonical(),
            self.room_number.canonical(),
            text(&self.admission_type),
            self.discharge_date.canonical(),
            text(&self.medication),
            text(&self.test_results),
        ];
        for (column, value) in &self.extra {
            parts.push(format!("{column}={}", text(value)));
        }
        parts.join("\u{1f}")
    }

    /// The document persisted for this record. Keys follow the CSV header.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(constants::NAME, text_bson(&self.name));
        doc.insert(constants::AGE, int_bson(&self.age));
        doc.insert(constants::GENDER, text_bson(&self.gender));
        doc.insert(constants::BLOOD_TYPE, text_bson(&self.blood_type));
        doc.insert(constants::MEDICAL_CONDITION, text_bson(&self.medical_condition));
        doc.insert(constants::DATE_OF_ADMISSION, date_bson(&self.date_of_admission));
        doc.insert(constants::DOCTOR, text_bson(&self.doctor));
        doc.insert(constants::HOSPITAL, text_bson(&self.hospital));
        doc.insert(constants::INSURANCE_PROVIDER, text_bson(&self.insurance_provider));
        doc.insert(
            constants::BILLING_AMOUNT,
            self.billing_amount.value().map_or(Bson::Null, |v| Bson::Double(*v)),
        );
        doc.insert(constants::ROOM_NUMBER, int_bson(&self.room_number));
        doc.insert(constants::ADMISSION_TYPE, text_bson(&self.admission_type));
        doc.insert(constants::DISCHARGE_DATE, date_bson(&self.discharge_date));
        doc.insert(constants::MEDICATION, text_bson(&self.medication));
        doc.insert(constants::TEST_RESULTS, text_bson(&self.test_results));
        for (column, value) in &self.extra {
            doc.insert(column.as_str(), text_bson(value));
        }
        doc.insert(constants::CREATED_AT, datetime_bson(&self.created_at));
        doc.insert(constants::UPDATED_AT, datetime_bson(&self.updated_at));
        doc
    }
}

fn text_bson(value: &Option<String>) -> Bson {
    value.as_ref().map_or(Bson::Null, |s| Bson::String(s.clone()))
}

fn int_bson(value: &FieldValue<i64>) -> Bson {
    value.value().map_or(Bson::Null, |v| Bson::Int64(*v))
}

fn date_bson(value: &FieldValue<NaiveDate>) -> Bson {
    value
        .value()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(Bson::Null, |midnight| datetime_bson(&midnight.and_utc()))
}

fn datetime_bson(value: &DateTime<Utc>) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(value.timestamp_millis()))
}

/// A non-fatal finding attached to a single source row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Diagnostic {
    Validation {
        line: u64,
        column: String,
        issue: ValidationIssue,
    },
    Transform {
        line: u64,
        column: String,
        issue: TransformIssue,
    },
}

impl Diagnostic {
    pub fn line(&self) -> u64 {
        match self {
            Diagnostic::Validation { line, .. } | Diagnostic::Transform { line, .. } => *line,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Diagnostic::Validation { column, .. } | Diagnostic::Transform { column, .. } => column,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Validation { line, column, issue } => {
                write!(f, "line {line}, '{column}': {issue}")
            }
            Diagnostic::Transform { line, column, issue } => {
                write!(f, "line {line}, '{column}': {issue}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    MissingValue,
    NotANumber { value: String },
    OutOfRange { value: String, constraint: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingValue => write!(f, "missing value"),
            ValidationIssue::NotANumber { value } => write!(f, "'{value}' is not a number"),
            ValidationIssue::OutOfRange { value, constraint } => {
                write!(f, "{value} violates {constraint}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformIssue {
    MissingDate,
    UnparsableDate { value: String },
}

impl fmt::Display for TransformIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformIssue::MissingDate => write!(f, "no date, stored as null"),
            TransformIssue::UnparsableDate { value } => {
                write!(f, "unparsable date '{value}', stored as null")
            }
        }
    }
}
