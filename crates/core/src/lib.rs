//! # Myopia Core
//!
//! Myopia progression engine for pediatric myopia-control clinics.
//!
//! The engine turns a patient's visit history into:
//! - spherical equivalent per eye, always derived from sphere and cylinder
//! - annualized SE and axial-length progression rates, per interval and over a window
//! - a NORMAL / YELLOW / RED risk tier against clinic thresholds
//! - treatment-period segments on the patient's age axis
//! - a field-gated plain-text clinical note
//!
//! Engine functions are pure and synchronous; they borrow immutable snapshots and never
//! touch storage. Stores are reached only through the [`RecordStore`] and [`SettingsStore`]
//! ports, which [`ProgressionService`] queries afresh on every report.
//!
//! **No presentation concerns**: charts, PDF layout and record forms belong to callers.

pub mod config;
pub mod constants;
pub mod error;
pub mod note;
pub mod progression;
pub mod report;
pub mod repositories;
pub mod risk;
pub mod timeline;
pub mod validation;
pub mod visit;

pub use config::{resolve_path, ClinicSettings};
pub use error::{MyopiaError, MyopiaResult};
pub use note::{render_note, NoteField, NoteTemplateConfig};
pub use progression::{
    annotate_visit_history, compute_endpoint_progression, compute_pairwise_progression,
    AnnotatedVisit, IntervalProgression, ProgressionRates, ProgressionResult, ProgressionWindow,
    Reliability,
};
pub use report::{PatientReport, ProgressionService};
pub use repositories::memory::{InMemoryRecordStore, StaticSettingsStore};
pub use repositories::yaml::{load_records, parse_records, render_records, save_records};
pub use repositories::{RecordStore, SettingsStore};
pub use risk::{classify_risk, AxisThresholds, RiskLevel, RiskThresholdConfig};
pub use timeline::{
    build_treatment_segments, build_treatment_segments_at, TreatmentColorMap, TreatmentSegment,
};
pub use visit::{derive_se, years_between, EyeMeasurement, Patient, TreatmentMethod, VisitRecord};

pub use myopia_types::{Eye, EyePair, HexColor};
