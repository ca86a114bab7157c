use crate::types::PatientRecord;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Records that are identical across every business field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub fingerprint: String,
    /// Source lines of every member, first occurrence first
    pub lines: Vec<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    /// Records beyond the first of their group
    pub duplicate_count: usize,
    pub groups: Vec<DuplicateGroup>,
}

/// SHA-256 (hex) of the record's business fields. Audit timestamps are not
/// part of the fingerprint, so the same row from two runs still matches.
pub fn compute_record_fingerprint(record: &PatientRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.business_key().as_bytes());
    hex::encode(hasher.finalize())
}

/// Finds exact duplicates. The records are only read.
#[instrument(skip_all, fields(records = records.len()))]
pub fn detect_duplicates(records: &[PatientRecord]) -> DuplicateReport {
    let mut first_seen: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut members: Vec<(String, Vec<u64>)> = Vec::new();

    for record in records {
        let fingerprint = compute_record_fingerprint(record);
        match first_seen.get(&fingerprint) {
            Some(&slot) => members[slot].1.push(record.line),
            None => {
                first_seen.insert(fingerprint.clone(), members.len());
                members.push((fingerprint, vec![record.line]));
            }
        }
    }

    let groups: Vec<DuplicateGroup> = members
        .into_iter()
        .filter(|(_, lines)| lines.len() > 1)
        .map(|(fingerprint, lines)| DuplicateGroup { fingerprint, lines })
        .collect();
    let duplicate_count = groups.iter().map(|g| g.lines.len() - 1).sum();

    info!("   Duplicates: {} ({} groups)", duplicate_count, groups.len());

    DuplicateReport {
        duplicate_count,
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;
    use chrono::{Duration, NaiveDate, Utc};

    fn patient(line: u64, name: &str) -> PatientRecord {
        let now = Utc::now();
        PatientRecord {
            line,
            name: Some(name.to_string()),
            age: FieldValue::Present(45),
            gender: Some("Female".to_string()),
            blood_type: Some("O+".to_string()),
            medical_condition: Some("Diabetes".to_string()),
            date_of_admission: FieldValue::Present(NaiveDate::from_ymd_opt(2022, 9, 19).unwrap()),
            doctor: Some("Samantha Davies".to_string()),
            hospital: Some("Kim Inc".to_string()),
            insurance_provider: Some("Medicare".to_string()),
            billing_amount: FieldValue::Present(33643.33),
            room_number: FieldValue::Present(265),
            admission_type: Some("Emergency".to_string()),
            discharge_date: FieldValue::Present(NaiveDate::from_ymd_opt(2022, 10, 7).unwrap()),
            medication: Some("Ibuprofen".to_string()),
            test_results: Some("Inconclusive".to_string()),
            extra: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn k_duplicate_pairs_report_k() {
        let records = vec![
            patient(2, "A"),
            patient(3, "B"),
            patient(4, "A"),
            patient(5, "C"),
            patient(6, "B"),
            patient(7, "D"),
        ];
        let report = detect_duplicates(&records);

        assert_eq!(report.duplicate_count, 2);
        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[0].lines, vec![2, 4]);
        assert_eq!(report.groups[1].lines, vec![3, 6]);
    }

    #[test]
    fn a_triple_counts_two_duplicates() {
        let records = vec![patient(2, "A"), patient(3, "A"), patient(4, "A")];
        let report = detect_duplicates(&records);
        assert_eq!(report.duplicate_count, 2);
        assert_eq!(report.groups.len(), 1);
    }

    #[test]
    fn audit_timestamps_do_not_prevent_a_match() {
        let first = patient(2, "A");
        let mut second = patient(3, "A");
        second.created_at = first.created_at + Duration::hours(3);
        second.updated_at = second.created_at;

        assert_eq!(compute_record_fingerprint(&first), compute_record_fingerprint(&second));
        assert_eq!(detect_duplicates(&[first, second]).duplicate_count, 1);
    }

    #[test]
    fn any_business_field_difference_breaks_the_match() {
        let first = patient(2, "A");
        let mut second = patient(3, "A");
        second.room_number = FieldValue::Present(266);
        assert_eq!(detect_duplicates(&[first, second]).duplicate_count, 0);
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = compute_record_fingerprint(&patient(2, "A"));
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn empty_input_has_no_duplicates() {
        let report = detect_duplicates(&[]);
        assert_eq!(report.duplicate_count, 0);
        assert!(report.groups.is_empty());
    }
}
