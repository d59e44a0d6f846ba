//! Visit records, patients and the spherical-equivalent derivation.
//!
//! Every other engine component reads measurements through this module. Spherical
//! equivalent is never stored: [`VisitRecord::se`] derives it from the current sphere and
//! cylinder on every access, so an edit to either value can never leave a stale SE behind.

use crate::constants::DAYS_PER_YEAR;
use chrono::NaiveDate;
use myopia_types::{Eye, EyePair};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Derives the spherical equivalent for one eye.
///
/// Returns `None` when `sphere` is absent, whatever the cylinder. A missing cylinder is
/// treated as zero. No rounding is applied; formatting belongs to the caller.
pub fn derive_se(sphere: Option<f64>, cylinder: Option<f64>) -> Option<f64> {
    sphere.map(|s| s + cylinder.unwrap_or(0.0) / 2.0)
}

/// Exact fractional years from `from` to `to` (negative if `to` is earlier).
pub fn years_between(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / DAYS_PER_YEAR
}

/// Myopia control treatment in effect at a visit.
///
/// Values read from a record store that do not match a known method are kept as
/// `Unrecognised` rather than rejected; they colour with the clinic's fallback colour.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TreatmentMethod {
    /// Low-dose atropine drops.
    Atropine,
    /// Orthokeratology lenses.
    OrthoK,
    /// Peripheral defocus spectacle lenses.
    DefocusSpectacles,
    /// Dual-focus or multifocal soft contact lenses.
    DefocusContactLens,
    /// Repeated low-level red-light therapy.
    RedLight,
    /// More than one treatment at once (e.g. atropine with ortho-k).
    Combined,
    /// Single-vision correction only.
    SingleVision,
    /// Any other value supplied by the record store.
    Unrecognised(String),
}

impl TreatmentMethod {
    /// Every enumerated method. A clinic colour map must cover all of them.
    pub const KNOWN: [TreatmentMethod; 7] = [
        TreatmentMethod::Atropine,
        TreatmentMethod::OrthoK,
        TreatmentMethod::DefocusSpectacles,
        TreatmentMethod::DefocusContactLens,
        TreatmentMethod::RedLight,
        TreatmentMethod::Combined,
        TreatmentMethod::SingleVision,
    ];

    /// Convert to the stored string form.
    pub fn to_wire(&self) -> &str {
        match self {
            TreatmentMethod::Atropine => "atropine",
            TreatmentMethod::OrthoK => "ortho_k",
            TreatmentMethod::DefocusSpectacles => "defocus_spectacles",
            TreatmentMethod::DefocusContactLens => "defocus_contact_lens",
            TreatmentMethod::RedLight => "red_light",
            TreatmentMethod::Combined => "combined",
            TreatmentMethod::SingleVision => "single_vision",
            TreatmentMethod::Unrecognised(raw) => raw,
        }
    }

    /// Parse the stored string form; unknown values become `Unrecognised`.
    pub fn from_wire(s: &str) -> Self {
        match s.trim() {
            "atropine" => TreatmentMethod::Atropine,
            "ortho_k" => TreatmentMethod::OrthoK,
            "defocus_spectacles" => TreatmentMethod::DefocusSpectacles,
            "defocus_contact_lens" => TreatmentMethod::DefocusContactLens,
            "red_light" => TreatmentMethod::RedLight,
            "combined" => TreatmentMethod::Combined,
            "single_vision" => TreatmentMethod::SingleVision,
            other => TreatmentMethod::Unrecognised(other.to_owned()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TreatmentMethod::Unrecognised(_))
    }

    /// Human-readable label used in clinical notes.
    pub fn label(&self) -> &str {
        match self {
            TreatmentMethod::Atropine => "Atropine",
            TreatmentMethod::OrthoK => "Ortho-K",
            TreatmentMethod::DefocusSpectacles => "Defocus spectacles",
            TreatmentMethod::DefocusContactLens => "Defocus contact lenses",
            TreatmentMethod::RedLight => "Red-light therapy",
            TreatmentMethod::Combined => "Combined treatment",
            TreatmentMethod::SingleVision => "Single vision",
            TreatmentMethod::Unrecognised(raw) => raw,
        }
    }
}

impl fmt::Display for TreatmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for TreatmentMethod {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for TreatmentMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(TreatmentMethod::from_wire(&s))
    }
}

/// Raw measurements for one eye at one visit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EyeMeasurement {
    /// Sphere, dioptres.
    pub sphere: Option<f64>,
    /// Cylinder, dioptres.
    pub cylinder: Option<f64>,
    /// Axial length, millimetres.
    pub axial_length: Option<f64>,
}

impl EyeMeasurement {
    pub fn se(&self) -> Option<f64> {
        derive_se(self.sphere, self.cylinder)
    }
}

/// A single clinic visit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VisitRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub eyes: EyePair<EyeMeasurement>,
    /// Whether a new prescription was issued. `None` when not recorded.
    pub new_prescription: Option<bool>,
    pub treatment: Option<TreatmentMethod>,
    pub notes: String,
}

impl VisitRecord {
    /// Creates an empty visit for `patient_id` on `date` with a fresh id.
    pub fn new(patient_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            date,
            eyes: EyePair::default(),
            new_prescription: None,
            treatment: None,
            notes: String::new(),
        }
    }

    /// Spherical equivalent for `eye`, derived from the current sphere and cylinder.
    pub fn se(&self, eye: Eye) -> Option<f64> {
        self.eyes.get(eye).se()
    }

    pub fn axial_length(&self, eye: Eye) -> Option<f64> {
        self.eyes.get(eye).axial_length
    }

    pub fn se_pair(&self) -> EyePair<Option<f64>> {
        self.eyes.map(|_, m| m.se())
    }

    pub fn axial_length_pair(&self) -> EyePair<Option<f64>> {
        self.eyes.map(|_, m| m.axial_length)
    }

    /// Replaces the refraction for one eye.
    pub fn set_refraction(&mut self, eye: Eye, sphere: Option<f64>, cylinder: Option<f64>) {
        let m = self.eyes.get_mut(eye);
        m.sphere = sphere;
        m.cylinder = cylinder;
    }

    pub fn set_axial_length(&mut self, eye: Eye, axial_length: Option<f64>) {
        self.eyes.get_mut(eye).axial_length = axial_length;
    }
}

/// A registered patient.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub birth_date: NaiveDate,
    pub chart_number: Option<String>,
    pub default_treatment: Option<TreatmentMethod>,
    pub notes: String,
}

impl Patient {
    pub fn new(name: impl Into<String>, birth_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            birth_date,
            chart_number: None,
            default_treatment: None,
            notes: String::new(),
        }
    }
}
