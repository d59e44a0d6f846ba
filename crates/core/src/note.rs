//! Plain-text clinical note assembly.
//!
//! A note is a fixed sequence of optional lines. Each line is gated by a [`NoteField`] in the
//! clinic's [`NoteTemplateConfig`]:
//!
//! - a disabled field produces nothing;
//! - an enabled field whose data is missing produces a labelled "not available" line.
//!
//! Lines always appear in [`NoteField::CANONICAL`] order, whatever order the clinic enabled
//! them in. The output is pasted straight into an external record system, so nothing is
//! escaped.

use crate::constants::{NOTE_EYE_NOT_AVAILABLE, NOTE_NOT_AVAILABLE, NOTE_NO_FIELDS_SELECTED};
use crate::progression::ProgressionResult;
use crate::visit::VisitRecord;
use myopia_types::EyePair;
use serde::{Deserialize, Serialize};

/// A section of the clinical note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteField {
    TreatmentMethod,
    SeValues,
    AlValues,
    SeRate,
    AlRate,
    NewPrescription,
    CustomComment,
}

impl NoteField {
    /// Output order of note lines.
    pub const CANONICAL: [NoteField; 7] = [
        NoteField::TreatmentMethod,
        NoteField::SeValues,
        NoteField::AlValues,
        NoteField::SeRate,
        NoteField::AlRate,
        NoteField::NewPrescription,
        NoteField::CustomComment,
    ];

    fn label(self) -> &'static str {
        match self {
            NoteField::TreatmentMethod => "Treatment",
            NoteField::SeValues => "SE",
            NoteField::AlValues => "AL",
            NoteField::SeRate => "SE progression",
            NoteField::AlRate => "AL progression",
            NoteField::NewPrescription => "New prescription",
            NoteField::CustomComment => "Comment",
        }
    }
}

/// Clinic note template: which fields to include, plus a free-text closing comment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteTemplateConfig {
    pub enabled_fields: Vec<NoteField>,
    pub custom_comment: String,
}

impl Default for NoteTemplateConfig {
    fn default() -> Self {
        Self {
            enabled_fields: NoteField::CANONICAL.to_vec(),
            custom_comment: String::new(),
        }
    }
}

impl NoteTemplateConfig {
    pub fn is_enabled(&self, field: NoteField) -> bool {
        self.enabled_fields.contains(&field)
    }
}

/// Renders the note for `latest_visit` and the most recent progression summary.
///
/// Returns [`NOTE_NO_FIELDS_SELECTED`] when no field is enabled; defaults are never
/// substituted for an explicit empty selection. Lines are joined with `\n` and there is no
/// trailing newline.
pub fn render_note(
    latest_visit: &VisitRecord,
    progression: Option<&ProgressionResult>,
    config: &NoteTemplateConfig,
) -> String {
    let rates = progression.filter(|p| p.has_rates());

    let lines: Vec<String> = NoteField::CANONICAL
        .into_iter()
        .filter(|field| config.is_enabled(*field))
        .map(|field| {
            let body = match field {
                NoteField::TreatmentMethod => {
                    latest_visit.treatment.as_ref().map(|t| t.to_string())
                }
                NoteField::SeValues => per_eye(&latest_visit.se_pair(), |v| format!("{v:+.2} D")),
                NoteField::AlValues => {
                    per_eye(&latest_visit.axial_length_pair(), |v| format!("{v:.2} mm"))
                }
                NoteField::SeRate => {
                    rates.and_then(|p| per_eye(&p.se_rate, |v| format!("{v:+.2} D/yr")))
                }
                NoteField::AlRate => {
                    rates.and_then(|p| per_eye(&p.al_rate, |v| format!("{v:+.2} mm/yr")))
                }
                NoteField::NewPrescription => latest_visit
                    .new_prescription
                    .map(|issued| if issued { "issued" } else { "not issued" }.to_string()),
                NoteField::CustomComment => {
                    if config.custom_comment.trim().is_empty() {
                        None
                    } else {
                        return config.custom_comment.clone();
                    }
                }
            };
            let body = body.unwrap_or_else(|| NOTE_NOT_AVAILABLE.to_string());
            format!("{}: {}", field.label(), body)
        })
        .collect();

    if lines.is_empty() {
        return NOTE_NO_FIELDS_SELECTED.to_string();
    }
    lines.join("\n")
}

/// `OD <value>, OS <value>`, or `None` when neither eye has a value.
fn per_eye(values: &EyePair<Option<f64>>, fmt: impl Fn(f64) -> String) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let parts: Vec<String> = values
        .iter()
        .map(|(eye, value)| {
            let shown = value
                .map(&fmt)
                .unwrap_or_else(|| NOTE_EYE_NOT_AVAILABLE.to_string());
            format!("{eye} {shown}")
        })
        .collect();
    Some(parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::{ProgressionWindow, Reliability};
    use crate::risk::RiskLevel;
    use crate::visit::TreatmentMethod;
    use chrono::NaiveDate;
    use myopia_types::Eye;
    use uuid::Uuid;

    fn latest() -> VisitRecord {
        let on = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
        let mut v = VisitRecord::new(Uuid::nil(), on);
        v.set_refraction(Eye::Od, Some(-2.0), Some(-1.0));
        v.set_refraction(Eye::Os, Some(-1.75), None);
        v.set_axial_length(Eye::Od, Some(24.123));
        v.set_axial_length(Eye::Os, Some(23.9));
        v.treatment = Some(TreatmentMethod::Atropine);
        v.new_prescription = Some(true);
        v
    }

    fn progression() -> ProgressionResult {
        ProgressionResult {
            se_rate: EyePair::new(Some(-0.5), Some(-0.25)),
            al_rate: EyePair::new(Some(0.2), None),
            risk_level: RiskLevel::Normal,
            reliability: Some(Reliability::High),
            years_elapsed: Some(1.5),
            window: ProgressionWindow::AllHistoryEndpoints,
        }
    }

    fn config(fields: &[NoteField], comment: &str) -> NoteTemplateConfig {
        NoteTemplateConfig {
            enabled_fields: fields.to_vec(),
            custom_comment: comment.to_string(),
        }
    }

    #[test]
    fn renders_every_section_in_canonical_order() {
        let mut reversed = NoteField::CANONICAL.to_vec();
        reversed.reverse();
        let note = render_note(
            &latest(),
            Some(&progression()),
            &config(&reversed, "Review in 6 months."),
        );

        let expected = "Treatment: Atropine\n\
                        SE: OD -2.50 D, OS -1.75 D\n\
                        AL: OD 24.12 mm, OS 23.90 mm\n\
                        SE progression: OD -0.50 D/yr, OS -0.25 D/yr\n\
                        AL progression: OD +0.20 mm/yr, OS n/a\n\
                        New prescription: issued\n\
                        Review in 6 months.";
        assert_eq!(note, expected);
    }

    #[test]
    fn empty_selection_is_not_refilled_with_defaults() {
        let note = render_note(&latest(), Some(&progression()), &config(&[], "ignored"));
        assert_eq!(note, NOTE_NO_FIELDS_SELECTED);
    }

    #[test]
    fn missing_data_renders_placeholders_not_gaps() {
        let on = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
        let bare = VisitRecord::new(Uuid::nil(), on);

        let note = render_note(&bare, None, &config(&NoteField::CANONICAL, "  "));
        let lines: Vec<&str> = note.lines().collect();

        assert_eq!(lines.len(), NoteField::CANONICAL.len());
        assert!(lines.iter().all(|l| l.ends_with(NOTE_NOT_AVAILABLE)), "{note}");
        assert_eq!(lines[0], "Treatment: not available");
        assert_eq!(lines[6], "Comment: not available");
    }

    #[test]
    fn insufficient_progression_counts_as_missing() {
        let insufficient = ProgressionResult::insufficient(ProgressionWindow::LastTwo);
        let note = render_note(
            &latest(),
            Some(&insufficient),
            &config(&[NoteField::SeRate, NoteField::AlRate], ""),
        );
        assert_eq!(
            note,
            "SE progression: not available\nAL progression: not available"
        );
    }

    #[test]
    fn custom_comment_is_verbatim_and_last() {
        let comment = "Continue 0.05% atropine <nightly> & recheck: \"AL\"";
        let note = render_note(
            &latest(),
            None,
            &config(&[NoteField::CustomComment, NoteField::TreatmentMethod], comment),
        );
        assert_eq!(note, format!("Treatment: Atropine\n{comment}"));
    }

    #[test]
    fn prescription_marker_distinguishes_no_from_unknown() {
        let mut visit = latest();
        visit.new_prescription = Some(false);
        let cfg = config(&[NoteField::NewPrescription], "");
        assert_eq!(render_note(&visit, None, &cfg), "New prescription: not issued");

        visit.new_prescription = None;
        assert_eq!(
            render_note(&visit, None, &cfg),
            "New prescription: not available"
        );
    }

    #[test]
    fn enabling_one_field_changes_exactly_one_line() {
        let visit = latest();
        let p = progression();

        for field in NoteField::CANONICAL {
            let from_empty = render_note(&visit, Some(&p), &config(&[field], "Comment text"));
            assert_eq!(from_empty.lines().count(), 1, "{field:?}");
            assert_ne!(from_empty, NOTE_NO_FIELDS_SELECTED);

            let others: Vec<NoteField> = NoteField::CANONICAL
                .into_iter()
                .filter(|f| *f != field)
                .collect();
            let without = render_note(&visit, Some(&p), &config(&others, "Comment text"));
            let mut with_fields = others.clone();
            with_fields.push(field);
            let with = render_note(&visit, Some(&p), &config(&with_fields, "Comment text"));

            let without: Vec<&str> = without.lines().collect();
            let with: Vec<&str> = with.lines().collect();
            assert_eq!(with.len(), without.len() + 1, "{field:?}");

            let added: Vec<&str> = with
                .iter()
                .filter(|line| !without.contains(line))
                .copied()
                .collect();
            assert_eq!(added, vec![from_empty.as_str()], "{field:?}");

            let kept: Vec<&str> = with
                .iter()
                .filter(|line| **line != from_empty)
                .copied()
                .collect();
            assert_eq!(kept, without, "{field:?}");
        }
    }

    #[test]
    fn template_config_defaults_only_when_key_missing() {
        let cfg: NoteTemplateConfig =
            serde_yaml::from_str("custom_comment: hi").expect("partial config");
        assert_eq!(cfg.enabled_fields, NoteField::CANONICAL.to_vec());

        let cfg: NoteTemplateConfig =
            serde_yaml::from_str("enabled_fields: []").expect("explicit empty list");
        assert!(cfg.enabled_fields.is_empty());
    }
}
