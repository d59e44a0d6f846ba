//! Treatment timeline segments for progression charts.
//!
//! The patient's age axis is split into one segment per visit-to-visit interval during which
//! a treatment method was recorded, plus a single open segment from the latest visit to the
//! patient's current age. Adjacent segments with the same method are not merged.

use crate::constants::{CLOSED_SEGMENT_OPACITY, CURRENT_SEGMENT_OPACITY, DEFAULT_FALLBACK_RGB};
use crate::error::{MyopiaError, MyopiaResult};
use crate::visit::{years_between, TreatmentMethod, VisitRecord};
use chrono::{NaiveDate, Utc};
use myopia_types::HexColor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Display colour for every enumerated treatment method plus a fallback.
///
/// Construction fails unless every method in [`TreatmentMethod::KNOWN`] has an entry, so a
/// loaded map can never leave a segment without a colour. Unset and unrecognised methods use
/// the fallback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreatmentColorsFile", into = "TreatmentColorsFile")]
pub struct TreatmentColorMap {
    fallback: HexColor,
    methods: HashMap<TreatmentMethod, HexColor>,
}

impl TreatmentColorMap {
    /// Builds a colour map, checking that it covers every known method.
    ///
    /// # Errors
    ///
    /// - `MyopiaError::MissingTreatmentColor` if a known method has no entry.
    /// - `MyopiaError::InvalidSettings` if an entry is keyed by an unrecognised method.
    pub fn new(
        fallback: HexColor,
        methods: HashMap<TreatmentMethod, HexColor>,
    ) -> MyopiaResult<Self> {
        if let Some(unknown) = methods.keys().find(|m| !m.is_known()) {
            return Err(MyopiaError::InvalidSettings(format!(
                "colour map entry for unknown treatment method '{}'",
                unknown.to_wire()
            )));
        }
        if let Some(missing) = TreatmentMethod::KNOWN
            .iter()
            .find(|m| !methods.contains_key(*m))
        {
            return Err(MyopiaError::MissingTreatmentColor(
                missing.to_wire().to_owned(),
            ));
        }
        Ok(Self { fallback, methods })
    }

    /// Colour for `method`, falling back for unset or unrecognised methods.
    pub fn color_for(&self, method: Option<&TreatmentMethod>) -> &HexColor {
        method
            .and_then(|m| self.methods.get(m))
            .unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &HexColor {
        &self.fallback
    }
}

impl Default for TreatmentColorMap {
    fn default() -> Self {
        let methods = HashMap::from([
            (TreatmentMethod::Atropine, HexColor::from_rgb(0x4e, 0x79, 0xa7)),
            (TreatmentMethod::OrthoK, HexColor::from_rgb(0xf2, 0x8e, 0x2b)),
            (TreatmentMethod::DefocusSpectacles, HexColor::from_rgb(0x59, 0xa1, 0x4f)),
            (TreatmentMethod::DefocusContactLens, HexColor::from_rgb(0x76, 0xb7, 0xb2)),
            (TreatmentMethod::RedLight, HexColor::from_rgb(0xe1, 0x57, 0x59)),
            (TreatmentMethod::Combined, HexColor::from_rgb(0xb0, 0x7a, 0xa1)),
            (TreatmentMethod::SingleVision, HexColor::from_rgb(0xed, 0xc9, 0x48)),
        ]);
        let (red, green, blue) = DEFAULT_FALLBACK_RGB;
        Self {
            fallback: HexColor::from_rgb(red, green, blue),
            methods,
        }
    }
}

/// Settings-file shape of [`TreatmentColorMap`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreatmentColorsFile {
    pub fallback: HexColor,
    pub methods: BTreeMap<String, HexColor>,
}

impl TryFrom<TreatmentColorsFile> for TreatmentColorMap {
    type Error = MyopiaError;

    fn try_from(file: TreatmentColorsFile) -> MyopiaResult<Self> {
        let methods = file
            .methods
            .into_iter()
            .map(|(key, colour)| (TreatmentMethod::from_wire(&key), colour))
            .collect();
        TreatmentColorMap::new(file.fallback, methods)
    }
}

impl From<TreatmentColorMap> for TreatmentColorsFile {
    fn from(map: TreatmentColorMap) -> Self {
        Self {
            fallback: map.fallback,
            methods: map
                .methods
                .into_iter()
                .map(|(method, colour)| (method.to_wire().to_owned(), colour))
                .collect(),
        }
    }
}

/// A half-open interval `[start_age, end_age)` on the patient's age axis, in years.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TreatmentSegment {
    pub start_age: f64,
    pub end_age: f64,
    pub color: HexColor,
    pub treatment: TreatmentMethod,
    /// Open segment running from the latest visit to the patient's current age.
    pub is_current: bool,
    /// Fill opacity; the current segment is drawn stronger in the same base colour.
    pub opacity: f64,
}

/// Builds treatment segments up to the patient's age today.
pub fn build_treatment_segments(
    visits: &[VisitRecord],
    birth_date: NaiveDate,
    colors: &TreatmentColorMap,
) -> Vec<TreatmentSegment> {
    build_treatment_segments_at(visits, birth_date, colors, Utc::now().date_naive())
}

/// Builds treatment segments, closing the open segment at the patient's age on `today`.
///
/// Returns no segments for fewer than two visits. Visits without a treatment method leave a
/// gap rather than a placeholder segment, and a latest visit without one produces no open
/// segment.
pub fn build_treatment_segments_at(
    visits: &[VisitRecord],
    birth_date: NaiveDate,
    colors: &TreatmentColorMap,
    today: NaiveDate,
) -> Vec<TreatmentSegment> {
    if visits.len() < 2 {
        return Vec::new();
    }

    let mut ordered: Vec<&VisitRecord> = visits.iter().collect();
    ordered.sort_by_key(|v| v.date);

    let age = |on: NaiveDate| years_between(birth_date, on);
    let segment = |method: &TreatmentMethod, start_age: f64, end_age: f64, is_current: bool| {
        TreatmentSegment {
            start_age,
            end_age,
            color: colors.color_for(Some(method)).clone(),
            treatment: method.clone(),
            is_current,
            opacity: if is_current {
                CURRENT_SEGMENT_OPACITY
            } else {
                CLOSED_SEGMENT_OPACITY
            },
        }
    };

    let mut segments: Vec<TreatmentSegment> = ordered
        .windows(2)
        .filter_map(|pair| {
            let method = pair[0].treatment.as_ref()?;
            Some(segment(method, age(pair[0].date), age(pair[1].date), false))
        })
        .collect();

    if let Some(last) = ordered.last() {
        if let Some(method) = last.treatment.as_ref() {
            let start = age(last.date);
            let end = age(today).max(start);
            segments.push(segment(method, start, end, true));
        }
    }

    tracing::debug!(
        visits = visits.len(),
        segments = segments.len(),
        "built treatment segments"
    );

    segments
}
