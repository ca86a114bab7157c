/// Column names of the patient dataset, as they appear in the CSV header and as
/// field keys of the persisted documents.
pub const NAME: &str = "Name";
pub const AGE: &str = "Age";
pub const GENDER: &str = "Gender";
pub const BLOOD_TYPE: &str = "Blood Type";
pub const MEDICAL_CONDITION: &str = "Medical Condition";
pub const DATE_OF_ADMISSION: &str = "Date of Admission";
pub const DOCTOR: &str = "Doctor";
pub const HOSPITAL: &str = "Hospital";
pub const INSURANCE_PROVIDER: &str = "Insurance Provider";
pub const BILLING_AMOUNT: &str = "Billing Amount";
pub const ROOM_NUMBER: &str = "Room Number";
pub const ADMISSION_TYPE: &str = "Admission Type";
pub const DISCHARGE_DATE: &str = "Discharge Date";
pub const MEDICATION: &str = "Medication";
pub const TEST_RESULTS: &str = "Test Results";

/// Audit fields appended to every document
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

pub const PATIENT_COLUMN_COUNT: usize = 15;

/// Every column of the dataset in header order
pub const PATIENT_COLUMNS: [&str; PATIENT_COLUMN_COUNT] = [
    NAME,
    AGE,
    GENDER,
    BLOOD_TYPE,
    MEDICAL_CONDITION,
    DATE_OF_ADMISSION,
    DOCTOR,
    HOSPITAL,
    INSURANCE_PROVIDER,
    BILLING_AMOUNT,
    ROOM_NUMBER,
    ADMISSION_TYPE,
    DISCHARGE_DATE,
    MEDICATION,
    TEST_RESULTS,
];

pub const DATE_COLUMNS: [&str; 2] = [DATE_OF_ADMISSION, DISCHARGE_DATE];

/// Fields indexed after the bulk insert; these back the documented queries
/// (by patient, by condition, by hospital, by admission date range).
/// Fields that must always be indexed, whatever the configured list says
pub const MANDATORY_INDEX_FIELDS: [&str; 2] = [MEDICAL_CONDITION, HOSPITAL];

pub const DEFAULT_INDEX_FIELDS: [&str; 4] = [NAME, MEDICAL_CONDITION, HOSPITAL, DATE_OF_ADMISSION];

pub const DEFAULT_INPUT_PATH: &str = "data/healthcare_dataset.csv";
pub const DEFAULT_CONNECTION_URI: &str = "mongodb://localhost:27017/";
pub const DEFAULT_DATABASE: &str = "healthcare_db";
pub const DEFAULT_COLLECTION: &str = "patients";
pub const DEFAULT_CONFIG_FILE: &str = "migration.toml";
pub const DEFAULT_APP_NAME: &str = "patient_migrator";

/// Cell values treated as missing, in addition to blank cells
pub const NULL_TOKENS: [&str; 9] = ["NA", "N/A", "NaN", "nan", "NULL", "null", "None", "#N/A", "-NaN"];

/// Returns true if a raw cell carries no value.
pub fn is_null_cell(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NULL_TOKENS.contains(&trimmed)
}
