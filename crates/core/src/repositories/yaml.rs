//! Records YAML files.
//!
//! A records file lists patients, each with its visits nested underneath:
//!
//! ```yaml
//! patients:
//!   - id: 6f1c2a9e-58c4-4a6b-9a57-3d1f0c1b2e44
//!     name: Mina Park
//!     birth_date: 2014-05-02
//!     chart_number: C-1042
//!     default_treatment: atropine
//!     visits:
//!       - date: 2023-01-10
//!         od: { sphere: -2.0, cylinder: -0.5, axial_length: 24.1 }
//!         os: { sphere: -1.75, axial_length: 23.9 }
//!         treatment: atropine
//!         new_prescription: true
//! ```
//!
//! Nesting visits under their patient makes an orphaned visit unrepresentable in the file.
//! Missing ids are generated on load. A per-eye `se` may be present in files exported by
//! other systems; it is never trusted and is recomputed from sphere and cylinder.

use super::memory::InMemoryRecordStore;
use super::RecordStore;
use crate::error::{MyopiaError, MyopiaResult};
use crate::visit::{derive_se, EyeMeasurement, Patient, TreatmentMethod, VisitRecord};
use chrono::NaiveDate;
use myopia_types::{Eye, EyePair};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// Largest difference tolerated between a persisted SE and the recomputed one before the
/// persisted value is reported as stale.
const SE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordsFile {
    #[serde(default)]
    patients: Vec<StoredPatient>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredPatient {
    #[serde(default)]
    id: Option<Uuid>,
    name: String,
    birth_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chart_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_treatment: Option<TreatmentMethod>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    notes: String,
    #[serde(default)]
    visits: Vec<StoredVisit>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredVisit {
    #[serde(default)]
    id: Option<Uuid>,
    date: NaiveDate,
    #[serde(default)]
    od: StoredEye,
    #[serde(default)]
    os: StoredEye,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    new_prescription: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    treatment: Option<TreatmentMethod>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    notes: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredEye {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sphere: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cylinder: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    axial_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    se: Option<f64>,
}

impl StoredEye {
    /// Converts to a measurement, discarding any persisted SE.
    fn into_measurement(self, visit: Uuid, eye: Eye) -> EyeMeasurement {
        let derived = derive_se(self.sphere, self.cylinder);
        let stale = match (self.se, derived) {
            (Some(stored), Some(derived)) => (stored - derived).abs() > SE_TOLERANCE,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if stale {
            tracing::warn!(
                %visit,
                %eye,
                stored = ?self.se,
                derived = ?derived,
                "discarding stale persisted SE"
            );
        }

        EyeMeasurement {
            sphere: self.sphere,
            cylinder: self.cylinder,
            axial_length: self.axial_length,
        }
    }

    fn from_measurement(m: &EyeMeasurement) -> Self {
        Self {
            sphere: m.sphere,
            cylinder: m.cylinder,
            axial_length: m.axial_length,
            se: m.se(),
        }
    }
}

impl StoredVisit {
    fn into_visit(self, patient_id: Uuid) -> VisitRecord {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        VisitRecord {
            id,
            patient_id,
            date: self.date,
            eyes: EyePair::new(
                self.od.into_measurement(id, Eye::Od),
                self.os.into_measurement(id, Eye::Os),
            ),
            new_prescription: self.new_prescription,
            treatment: self.treatment,
            notes: self.notes,
        }
    }

    fn from_visit(v: &VisitRecord) -> Self {
        Self {
            id: Some(v.id),
            date: v.date,
            od: StoredEye::from_measurement(&v.eyes.od),
            os: StoredEye::from_measurement(&v.eyes.os),
            new_prescription: v.new_prescription,
            treatment: v.treatment.clone(),
            notes: v.notes.clone(),
        }
    }
}

/// Parses a records YAML document into a new in-memory store.
///
/// # Errors
///
/// - `MyopiaError::YamlDeserialization` for malformed documents or unknown keys.
/// - `MyopiaError::InvalidInput` for an invalid patient name, or a patient or visit id that
///   appears more than once in the file.
pub fn parse_records(yaml: &str) -> MyopiaResult<InMemoryRecordStore> {
    let file: RecordsFile = serde_yaml::from_str(yaml).map_err(MyopiaError::YamlDeserialization)?;
    let store = InMemoryRecordStore::new();
    let mut patient_ids = HashSet::new();
    let mut visit_ids = HashSet::new();

    for stored in file.patients {
        let patient_id = stored.id.unwrap_or_else(Uuid::new_v4);
        if !patient_ids.insert(patient_id) {
            return Err(MyopiaError::InvalidInput(format!(
                "duplicate patient id {patient_id} in records file"
            )));
        }

        let patient = Patient {
            id: patient_id,
            name: stored.name,
            birth_date: stored.birth_date,
            chart_number: stored.chart_number,
            default_treatment: stored.default_treatment,
            notes: stored.notes,
        };
        store.upsert_patient(patient)?;

        for visit in stored.visits {
            let visit = visit.into_visit(patient_id);
            if !visit_ids.insert(visit.id) {
                return Err(MyopiaError::InvalidInput(format!(
                    "duplicate visit id {} in records file",
                    visit.id
                )));
            }
            store.upsert_visit(visit)?;
        }
    }

    Ok(store)
}

/// Reads a records YAML file into a new in-memory store.
pub fn load_records(path: &Path) -> MyopiaResult<InMemoryRecordStore> {
    let yaml = std::fs::read_to_string(path).map_err(MyopiaError::FileRead)?;
    let store = parse_records(&yaml)?;
    tracing::info!(
        path = %path.display(),
        patients = store.list_patients()?.len(),
        visits = store.visit_count()?,
        "loaded records"
    );
    Ok(store)
}

/// Renders every patient and visit in `store` as a records YAML document.
///
/// Visits are written oldest first, with SE freshly derived for readers that want it.
pub fn render_records(store: &dyn RecordStore) -> MyopiaResult<String> {
    let mut file = RecordsFile::default();

    for patient in store.list_patients()? {
        let mut visits = store.list_visits(patient.id)?;
        visits.sort_by_key(|v| v.date);

        file.patients.push(StoredPatient {
            id: Some(patient.id),
            name: patient.name,
            birth_date: patient.birth_date,
            chart_number: patient.chart_number,
            default_treatment: patient.default_treatment,
            notes: patient.notes,
            visits: visits.iter().map(StoredVisit::from_visit).collect(),
        });
    }

    serde_yaml::to_string(&file).map_err(MyopiaError::YamlSerialization)
}

/// Writes every patient and visit in `store` to a records YAML file.
pub fn save_records(store: &dyn RecordStore, path: &Path) -> MyopiaResult<()> {
    let yaml = render_records(store)?;
    std::fs::write(path, yaml).map_err(MyopiaError::FileWrite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RECORDS: &str = r#"
patients:
  - id: 6f1c2a9e-58c4-4a6b-9a57-3d1f0c1b2e44
    name: Mina Park
    birth_date: 2014-05-02
    chart_number: C-1042
    default_treatment: atropine
    visits:
      - date: 2023-01-10
        od: { sphere: -2.0, cylinder: -0.5, axial_length: 24.1, se: -9.0 }
        os: { sphere: -1.75, axial_length: 23.9 }
        treatment: atropine
        new_prescription: true
      - date: 2024-01-10
        od: { sphere: -2.5, cylinder: -0.5, axial_length: 24.3 }
        os: { cylinder: -0.75, se: -0.375 }
        treatment: ortho_k
  - name: Leo Novak
    birth_date: 2013-11-20
"#;

    fn mina() -> Uuid {
        Uuid::parse_str("6f1c2a9e-58c4-4a6b-9a57-3d1f0c1b2e44").expect("valid uuid")
    }

    #[test]
    fn parses_patients_and_nested_visits() {
        let store = parse_records(RECORDS).expect("valid records");

        let patients = store.list_patients().expect("list patients");
        assert_eq!(patients.len(), 2);
        assert_eq!(patients[1].name, "Mina Park");
        assert_eq!(patients[1].chart_number.as_deref(), Some("C-1042"));
        assert_eq!(
            patients[1].default_treatment,
            Some(TreatmentMethod::Atropine)
        );

        let mut visits = store.list_visits(mina()).expect("list visits");
        visits.sort_by_key(|v| v.date);
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[1].treatment, Some(TreatmentMethod::OrthoK));
        assert_eq!(visits[0].new_prescription, Some(true));
        assert_eq!(visits[1].new_prescription, None);
    }

    #[test]
    fn persisted_se_is_recomputed_not_trusted() {
        let store = parse_records(RECORDS).expect("valid records");
        let mut visits = store.list_visits(mina()).expect("list visits");
        visits.sort_by_key(|v| v.date);

        // Stored -9.0 is stale; sphere -2.0 with cylinder -0.5 gives -2.25.
        assert_eq!(visits[0].se(Eye::Od), Some(-2.25));
        // No sphere, so no SE despite the stored value.
        assert_eq!(visits[1].se(Eye::Os), None);
    }

    #[test]
    fn rejects_unknown_keys() {
        let yaml = "patients:\n  - name: A\n    birth_date: 2015-01-01\n    eye_colour: blue\n";
        let err = parse_records(yaml).map(|_| ()).expect_err("unknown key");
        assert!(matches!(err, MyopiaError::YamlDeserialization(_)));
    }

    #[test]
    fn rejects_blank_names() {
        let yaml = "patients:\n  - name: ' '\n    birth_date: 2015-01-01\n";
        let err = parse_records(yaml).map(|_| ()).expect_err("blank name");
        assert!(matches!(err, MyopiaError::InvalidInput(_)));
    }

    #[test]
    fn rejects_visits_sharing_an_id() {
        let yaml = r#"
patients:
  - name: Mina Park
    birth_date: 2014-05-02
    visits:
      - id: 11111111-1111-4111-8111-111111111111
        date: 2023-01-10
      - id: 11111111-1111-4111-8111-111111111111
        date: 2024-01-10
"#;
        let err = parse_records(yaml).map(|_| ()).expect_err("duplicate visit id");
        match err {
            MyopiaError::InvalidInput(msg) => assert!(msg.contains("duplicate visit id"), "{msg}"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn rejects_patients_sharing_an_id() {
        let yaml = r#"
patients:
  - id: 6f1c2a9e-58c4-4a6b-9a57-3d1f0c1b2e44
    name: First Child
    birth_date: 2014-05-02
    visits:
      - date: 2023-01-10
  - id: 6f1c2a9e-58c4-4a6b-9a57-3d1f0c1b2e44
    name: Second Child
    birth_date: 2016-09-12
    visits:
      - date: 2024-01-10
"#;
        let err = parse_records(yaml).map(|_| ()).expect_err("duplicate patient id");
        match err {
            MyopiaError::InvalidInput(msg) => {
                assert!(msg.contains("duplicate patient id"), "{msg}")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn save_then_load_preserves_records() {
        let original = parse_records(RECORDS).expect("valid records");
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("records.yaml");

        save_records(&original, &path).expect("save records");
        let written = std::fs::read_to_string(&path).expect("read back");
        assert!(written.contains("se: -2.75"), "{written}");

        let reloaded = load_records(&path).expect("load records");
        assert_eq!(
            reloaded.list_patients().expect("patients"),
            original.list_patients().expect("patients")
        );

        let mut before = original.list_visits(mina()).expect("visits");
        let mut after = reloaded.list_visits(mina()).expect("visits");
        before.sort_by_key(|v| v.date);
        after.sort_by_key(|v| v.date);
        assert_eq!(before, after);
    }
}
