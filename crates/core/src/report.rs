//! Patient progression reports.
//!
//! [`ProgressionService`] is the one place that touches the store ports. Each call fetches
//! fresh snapshots of the patient, their visits and the clinic settings, then runs the pure
//! engine functions over them. Nothing is cached between calls, so a report always reflects
//! the stores as they were when it was requested.

use crate::error::{MyopiaError, MyopiaResult};
use crate::note::render_note;
use crate::progression::{
    annotate_visit_history, compute_endpoint_progression, AnnotatedVisit, ProgressionResult,
    ProgressionWindow,
};
use crate::repositories::{RecordStore, SettingsStore};
use crate::timeline::{build_treatment_segments_at, TreatmentSegment};
use crate::visit::Patient;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Everything the presentation layer needs to draw one patient's progression view.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientReport {
    pub patient: Patient,
    /// Oldest first, each row carrying the interval that led up to it.
    pub history: Vec<AnnotatedVisit>,
    pub summary: ProgressionResult,
    pub segments: Vec<TreatmentSegment>,
    /// Note for the most recent visit; `None` when the patient has no visits.
    pub note: Option<String>,
}

impl PatientReport {
    pub fn to_json_pretty(&self) -> MyopiaResult<String> {
        serde_json::to_string_pretty(self).map_err(MyopiaError::JsonSerialization)
    }
}

/// Builds [`PatientReport`]s from injected record and settings stores.
#[derive(Clone)]
pub struct ProgressionService {
    records: Arc<dyn RecordStore>,
    settings: Arc<dyn SettingsStore>,
}

impl ProgressionService {
    pub fn new(records: Arc<dyn RecordStore>, settings: Arc<dyn SettingsStore>) -> Self {
        Self { records, settings }
    }

    /// Builds a report with the timeline's open segment ending today.
    ///
    /// # Errors
    ///
    /// Returns `MyopiaError::PatientNotFound` for an unknown patient, or any error raised by
    /// the stores.
    pub fn patient_report(
        &self,
        patient_id: Uuid,
        window: ProgressionWindow,
    ) -> MyopiaResult<PatientReport> {
        self.patient_report_at(patient_id, window, Utc::now().date_naive())
    }

    /// Builds a report with the timeline's open segment ending on `today`.
    pub fn patient_report_at(
        &self,
        patient_id: Uuid,
        window: ProgressionWindow,
        today: NaiveDate,
    ) -> MyopiaResult<PatientReport> {
        let patient = self.records.get_patient(patient_id)?;
        let visits = self.records.list_visits(patient_id)?;
        let settings = self.settings.get_settings()?;

        let history = annotate_visit_history(&visits, &settings.thresholds);
        let summary = compute_endpoint_progression(&visits, &settings.thresholds, window);
        let segments = build_treatment_segments_at(
            &visits,
            patient.birth_date,
            &settings.treatment_colors,
            today,
        );

        // Latest by date; among same-day visits the last supplied wins.
        let latest = visits.iter().max_by_key(|v| v.date);
        let note = latest.map(|v| render_note(v, Some(&summary), &settings.note_template));

        tracing::debug!(
            %patient_id,
            visits = visits.len(),
            risk = %summary.risk_level,
            segments = segments.len(),
            "built patient report"
        );

        Ok(PatientReport {
            patient,
            history,
            summary,
            segments,
            note,
        })
    }
}
