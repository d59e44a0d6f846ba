//! Record and settings store ports, with in-process adapters.
//!
//! The engine never talks to storage. [`RecordStore`] and [`SettingsStore`] are the seams
//! through which the report service fetches immutable snapshots on every call:
//!
//! - [`memory::InMemoryRecordStore`] keeps patients and visits in memory and enforces the
//!   cascading patient delete.
//! - [`yaml`] loads and saves an in-memory store as a records YAML file.
//! - [`memory::StaticSettingsStore`] serves a fixed [`ClinicSettings`].

pub mod memory;
pub mod yaml;

use crate::config::ClinicSettings;
use crate::error::MyopiaResult;
use crate::note::NoteTemplateConfig;
use crate::risk::RiskThresholdConfig;
use crate::timeline::TreatmentColorMap;
use crate::visit::{Patient, VisitRecord};
use uuid::Uuid;

/// Supplies patient and visit snapshots.
pub trait RecordStore: Send + Sync {
    fn list_patients(&self) -> MyopiaResult<Vec<Patient>>;

    /// # Errors
    ///
    /// Returns `MyopiaError::PatientNotFound` for an unknown id.
    fn get_patient(&self, patient_id: Uuid) -> MyopiaResult<Patient>;

    /// Visits for a patient in no guaranteed order.
    ///
    /// # Errors
    ///
    /// Returns `MyopiaError::PatientNotFound` for an unknown id.
    fn list_visits(&self, patient_id: Uuid) -> MyopiaResult<Vec<VisitRecord>>;
}

/// Supplies per-clinic configuration snapshots.
pub trait SettingsStore: Send + Sync {
    fn get_thresholds(&self) -> MyopiaResult<RiskThresholdConfig>;
    fn get_treatment_colors(&self) -> MyopiaResult<TreatmentColorMap>;
    fn get_note_template_config(&self) -> MyopiaResult<NoteTemplateConfig>;

    fn get_settings(&self) -> MyopiaResult<ClinicSettings> {
        Ok(ClinicSettings {
            thresholds: self.get_thresholds()?,
            treatment_colors: self.get_treatment_colors()?,
            note_template: self.get_note_template_config()?,
        })
    }
}
