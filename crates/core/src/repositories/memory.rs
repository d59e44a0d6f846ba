//! In-memory store adapters.

use super::{RecordStore, SettingsStore};
use crate::config::ClinicSettings;
use crate::error::{MyopiaError, MyopiaResult};
use crate::note::NoteTemplateConfig;
use crate::risk::RiskThresholdConfig;
use crate::timeline::TreatmentColorMap;
use crate::validation::validate_patient_name;
use crate::visit::{Patient, VisitRecord};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Records {
    patients: HashMap<Uuid, Patient>,
    visits: HashMap<Uuid, Vec<VisitRecord>>,
}

/// Patients and visits held in memory.
///
/// Every visit belongs to a stored patient: visits for unknown patients are refused, and
/// deleting a patient deletes its visits with it. Reads return owned copies, so callers
/// never observe later writes.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Records>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> MyopiaResult<RwLockReadGuard<'_, Records>> {
        self.inner.read().map_err(|_| MyopiaError::StoreLock)
    }

    fn write(&self) -> MyopiaResult<RwLockWriteGuard<'_, Records>> {
        self.inner.write().map_err(|_| MyopiaError::StoreLock)
    }

    /// Inserts or replaces a patient, keeping any existing visits.
    ///
    /// # Errors
    ///
    /// Returns `MyopiaError::InvalidInput` if the patient name is empty or multi-line.
    pub fn upsert_patient(&self, patient: Patient) -> MyopiaResult<()> {
        validate_patient_name(&patient.name)?;
        let mut records = self.write()?;
        records.visits.entry(patient.id).or_default();
        records.patients.insert(patient.id, patient);
        Ok(())
    }

    /// Deletes a patient together with all of its visits.
    ///
    /// Returns the number of visits removed.
    pub fn delete_patient(&self, patient_id: Uuid) -> MyopiaResult<usize> {
        let mut records = self.write()?;
        if records.patients.remove(&patient_id).is_none() {
            return Err(MyopiaError::PatientNotFound(patient_id));
        }
        let removed = records
            .visits
            .remove(&patient_id)
            .map(|v| v.len())
            .unwrap_or(0);
        tracing::info!(%patient_id, visits = removed, "deleted patient and visits");
        Ok(removed)
    }

    /// Inserts a visit, or replaces the stored visit with the same id.
    ///
    /// # Errors
    ///
    /// Returns `MyopiaError::VisitOrphaned` if the visit's patient is not stored.
    pub fn upsert_visit(&self, visit: VisitRecord) -> MyopiaResult<()> {
        let mut records = self.write()?;
        if !records.patients.contains_key(&visit.patient_id) {
            return Err(MyopiaError::VisitOrphaned {
                visit: visit.id,
                patient: visit.patient_id,
            });
        }
        let visits = records.visits.entry(visit.patient_id).or_default();
        match visits.iter_mut().find(|v| v.id == visit.id) {
            Some(existing) => *existing = visit,
            None => visits.push(visit),
        }
        Ok(())
    }

    /// Removes one visit. Returns `false` if it was not stored.
    pub fn delete_visit(&self, patient_id: Uuid, visit_id: Uuid) -> MyopiaResult<bool> {
        let mut records = self.write()?;
        let Some(visits) = records.visits.get_mut(&patient_id) else {
            return Err(MyopiaError::PatientNotFound(patient_id));
        };
        let before = visits.len();
        visits.retain(|v| v.id != visit_id);
        Ok(visits.len() != before)
    }

    /// Total visits across all patients.
    pub fn visit_count(&self) -> MyopiaResult<usize> {
        Ok(self.read()?.visits.values().map(Vec::len).sum())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn list_patients(&self) -> MyopiaResult<Vec<Patient>> {
        let records = self.read()?;
        let mut patients: Vec<Patient> = records.patients.values().cloned().collect();
        patients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(patients)
    }

    fn get_patient(&self, patient_id: Uuid) -> MyopiaResult<Patient> {
        self.read()?
            .patients
            .get(&patient_id)
            .cloned()
            .ok_or(MyopiaError::PatientNotFound(patient_id))
    }

    fn list_visits(&self, patient_id: Uuid) -> MyopiaResult<Vec<VisitRecord>> {
        let records = self.read()?;
        if !records.patients.contains_key(&patient_id) {
            return Err(MyopiaError::PatientNotFound(patient_id));
        }
        Ok(records
            .visits
            .get(&patient_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Serves one fixed set of clinic settings.
#[derive(Clone, Debug, Default)]
pub struct StaticSettingsStore {
    settings: ClinicSettings,
}

impl StaticSettingsStore {
    pub fn new(settings: ClinicSettings) -> Self {
        Self { settings }
    }
}

impl SettingsStore for StaticSettingsStore {
    fn get_thresholds(&self) -> MyopiaResult<RiskThresholdConfig> {
        Ok(self.settings.thresholds)
    }

    fn get_treatment_colors(&self) -> MyopiaResult<TreatmentColorMap> {
        Ok(self.settings.treatment_colors.clone())
    }

    fn get_note_template_config(&self) -> MyopiaResult<NoteTemplateConfig> {
        Ok(self.settings.note_template.clone())
    }
}
