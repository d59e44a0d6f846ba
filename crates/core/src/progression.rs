//! Annualised progression rates.
//!
//! Two policies are provided:
//!
//! - [`compute_endpoint_progression`] summarises a window of visits with a secant rate
//!   between its chronological first and last visit. Intermediate visits never influence the
//!   result.
//! - [`compute_pairwise_progression`] measures the rate between exactly two adjacent visits
//!   and backs the per-row history table and chart point colouring
//!   ([`annotate_visit_history`]).
//!
//! Both feed the same [`classify_risk`].

use crate::constants::{
    HIGH_RELIABILITY_YEARS, MEDIUM_RELIABILITY_YEARS, MIN_PROGRESSION_INTERVAL_DAYS,
};
use crate::error::{MyopiaError, MyopiaResult};
use crate::risk::{classify_risk, RiskLevel, RiskThresholdConfig};
use crate::visit::{years_between, VisitRecord};
use chrono::NaiveDate;
use myopia_types::EyePair;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Signed rates per eye: SE in D/yr, AL in mm/yr.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ProgressionRates {
    pub se: EyePair<Option<f64>>,
    pub al: EyePair<Option<f64>>,
}

impl ProgressionRates {
    /// Rates from `first` to `last` over `years`. A pair of values missing on either side
    /// yields no rate for that eye and axis.
    fn between(first: &VisitRecord, last: &VisitRecord, years: f64) -> Self {
        let rate = |a: &Option<f64>, b: &Option<f64>| match (a, b) {
            (Some(a), Some(b)) => Some((b - a) / years),
            _ => None,
        };

        Self {
            se: first.se_pair().zip_with(&last.se_pair(), rate),
            al: first
                .axial_length_pair()
                .zip_with(&last.axial_length_pair(), rate),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.se.is_empty() && self.al.is_empty()
    }
}

/// How much weight a summary rate deserves, by the span it covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reliability {
    Low,
    Medium,
    High,
}

impl Reliability {
    pub fn from_years(years: f64) -> Self {
        if years > HIGH_RELIABILITY_YEARS {
            Reliability::High
        } else if years > MEDIUM_RELIABILITY_YEARS {
            Reliability::Medium
        } else {
            Reliability::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Reliability::Low => "low",
            Reliability::Medium => "medium",
            Reliability::High => "high",
        }
    }
}

/// Which visits an endpoint summary spans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionWindow {
    /// First and last visit of the whole supplied history.
    #[default]
    AllHistoryEndpoints,
    /// The two most recent visits.
    LastTwo,
}

/// Endpoint progression summary. Built fresh on every call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressionResult {
    pub se_rate: EyePair<Option<f64>>,
    pub al_rate: EyePair<Option<f64>>,
    pub risk_level: RiskLevel,
    /// `None` when there was not enough data to compute any rate.
    pub reliability: Option<Reliability>,
    pub years_elapsed: Option<f64>,
    pub window: ProgressionWindow,
}

impl ProgressionResult {
    /// The "no signal" result: normal risk, no rates.
    pub fn insufficient(window: ProgressionWindow) -> Self {
        Self {
            se_rate: EyePair::default(),
            al_rate: EyePair::default(),
            risk_level: RiskLevel::Normal,
            reliability: None,
            years_elapsed: None,
            window,
        }
    }

    pub fn has_rates(&self) -> bool {
        self.years_elapsed.is_some()
    }

    pub fn rates(&self) -> ProgressionRates {
        ProgressionRates {
            se: self.se_rate,
            al: self.al_rate,
        }
    }
}

fn chronological(visits: &[VisitRecord]) -> Vec<&VisitRecord> {
    let mut ordered: Vec<&VisitRecord> = visits.iter().collect();
    // Stable, so same-day visits keep their supplied order.
    ordered.sort_by_key(|v| v.date);
    ordered
}

/// Summarises progression across a window of visits using its first and last visit.
///
/// Returns [`ProgressionResult::insufficient`] when the window holds fewer than two visits
/// or spans fewer than [`MIN_PROGRESSION_INTERVAL_DAYS`] days. The interval guard applies
/// regardless of how large the measured change is.
pub fn compute_endpoint_progression(
    visits: &[VisitRecord],
    thresholds: &RiskThresholdConfig,
    window: ProgressionWindow,
) -> ProgressionResult {
    let ordered = chronological(visits);
    let windowed = match window {
        ProgressionWindow::AllHistoryEndpoints => &ordered[..],
        ProgressionWindow::LastTwo => &ordered[ordered.len().saturating_sub(2)..],
    };

    let (first, last) = match windowed {
        [first, .., last] => (*first, *last),
        _ => {
            tracing::debug!(visits = visits.len(), "fewer than two visits; no progression");
            return ProgressionResult::insufficient(window);
        }
    };

    let days = (last.date - first.date).num_days();
    if days < MIN_PROGRESSION_INTERVAL_DAYS {
        tracing::debug!(days, "visit span below minimum interval; no progression");
        return ProgressionResult::insufficient(window);
    }

    let years = years_between(first.date, last.date);
    let rates = ProgressionRates::between(first, last, years);

    ProgressionResult {
        se_rate: rates.se,
        al_rate: rates.al,
        risk_level: classify_risk(&rates, thresholds),
        reliability: Some(Reliability::from_years(years)),
        years_elapsed: Some(years),
        window,
    }
}

/// Rates between two adjacent visits, in the order given.
///
/// Visits on the same day yield no rates.
///
/// # Errors
///
/// Returns `MyopiaError::VisitsOutOfOrder` if `current` is dated before `previous`; ordering
/// is the caller's responsibility.
pub fn compute_pairwise_progression(
    previous: &VisitRecord,
    current: &VisitRecord,
) -> MyopiaResult<ProgressionRates> {
    if current.date < previous.date {
        return Err(MyopiaError::VisitsOutOfOrder {
            previous: previous.date,
            current: current.date,
        });
    }
    Ok(pairwise_rates(previous, current))
}

fn pairwise_rates(previous: &VisitRecord, current: &VisitRecord) -> ProgressionRates {
    let years = years_between(previous.date, current.date);
    if years == 0.0 {
        return ProgressionRates::default();
    }
    ProgressionRates::between(previous, current, years)
}

/// Progression over one visit-to-visit interval.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntervalProgression {
    pub previous_date: NaiveDate,
    pub years_elapsed: f64,
    pub rates: ProgressionRates,
    pub risk_level: RiskLevel,
}

/// A visit history row: the visit's derived values and the interval leading up to it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnnotatedVisit {
    pub visit_id: Uuid,
    pub date: NaiveDate,
    pub se: EyePair<Option<f64>>,
    pub axial_length: EyePair<Option<f64>>,
    /// `None` for the earliest visit.
    pub interval: Option<IntervalProgression>,
}

/// Annotates a visit history, oldest first, with pairwise rates and risk per interval.
pub fn annotate_visit_history(
    visits: &[VisitRecord],
    thresholds: &RiskThresholdConfig,
) -> Vec<AnnotatedVisit> {
    let ordered = chronological(visits);

    ordered
        .iter()
        .enumerate()
        .map(|(i, visit)| {
            let interval = i.checked_sub(1).map(|p| {
                let previous = ordered[p];
                let rates = pairwise_rates(previous, visit);
                IntervalProgression {
                    previous_date: previous.date,
                    years_elapsed: years_between(previous.date, visit.date),
                    rates,
                    risk_level: classify_risk(&rates, thresholds),
                }
            });

            AnnotatedVisit {
                visit_id: visit.id,
                date: visit.date,
                se: visit.se_pair(),
                axial_length: visit.axial_length_pair(),
                interval,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::AxisThresholds;
    use myopia_types::Eye;

    const TOLERANCE: f64 = 0.01;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn thresholds() -> RiskThresholdConfig {
        RiskThresholdConfig {
            se: AxisThresholds {
                yellow: 0.75,
                red: 1.5,
            },
            al: AxisThresholds {
                yellow: 0.30,
                red: 0.60,
            },
        }
    }

    fn visit(on: NaiveDate, od: (f64, f64, f64), os: Option<(f64, f64, f64)>) -> VisitRecord {
        let mut v = VisitRecord::new(Uuid::nil(), on);
        v.set_refraction(Eye::Od, Some(od.0), Some(od.1));
        v.set_axial_length(Eye::Od, Some(od.2));
        if let Some(os) = os {
            v.set_refraction(Eye::Os, Some(os.0), Some(os.1));
            v.set_axial_length(Eye::Os, Some(os.2));
        }
        v
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("rate should be present");
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn one_year_example_is_red() {
        let visits = vec![
            visit(date(2023, 1, 1), (-2.0, -1.0, 24.0), None),
            visit(date(2024, 1, 1), (-3.0, -1.0, 24.6), None),
        ];

        let result = compute_endpoint_progression(
            &visits,
            &thresholds(),
            ProgressionWindow::AllHistoryEndpoints,
        );

        assert_close(result.se_rate.od, -1.00);
        assert_close(result.al_rate.od, 0.60);
        assert_eq!(result.se_rate.os, None);
        assert_eq!(result.al_rate.os, None);
        assert_eq!(result.risk_level, RiskLevel::Red);
        assert_eq!(result.reliability, Some(Reliability::Medium));
    }

    #[test]
    fn identical_endpoints_give_a_real_zero() {
        let visits = vec![
            visit(date(2022, 1, 1), (-2.0, -0.5, 24.0), Some((-1.0, 0.0, 23.5))),
            visit(date(2023, 6, 1), (-2.0, -0.5, 24.0), Some((-1.0, 0.0, 23.5))),
        ];

        let result = compute_endpoint_progression(
            &visits,
            &thresholds(),
            ProgressionWindow::AllHistoryEndpoints,
        );

        assert_eq!(result.se_rate, EyePair::new(Some(0.0), Some(0.0)));
        assert_eq!(result.al_rate, EyePair::new(Some(0.0), Some(0.0)));
        assert_eq!(result.risk_level, RiskLevel::Normal);
        assert_eq!(result.reliability, Some(Reliability::High));
        assert!(result.has_rates());
    }

    #[test]
    fn single_visit_is_insufficient() {
        let visits = vec![visit(date(2023, 1, 1), (-2.0, -1.0, 24.0), None)];
        let result = compute_endpoint_progression(
            &visits,
            &thresholds(),
            ProgressionWindow::AllHistoryEndpoints,
        );
        assert_eq!(
            result,
            ProgressionResult::insufficient(ProgressionWindow::AllHistoryEndpoints)
        );
        assert!(result.rates().is_empty());
    }

    #[test]
    fn empty_history_is_insufficient() {
        let result = compute_endpoint_progression(&[], &thresholds(), ProgressionWindow::LastTwo);
        assert_eq!(result.risk_level, RiskLevel::Normal);
        assert!(!result.has_rates());
    }

    #[test]
    fn interval_guard_beats_large_changes() {
        let visits = vec![
            visit(date(2023, 1, 1), (-2.0, 0.0, 24.0), None),
            visit(date(2023, 1, 11), (-6.0, 0.0, 26.0), None),
        ];
        let result = compute_endpoint_progression(
            &visits,
            &thresholds(),
            ProgressionWindow::AllHistoryEndpoints,
        );
        assert_eq!(result.risk_level, RiskLevel::Normal);
        assert!(result.rates().is_empty());
        assert_eq!(result.reliability, None);
    }

    #[test]
    fn intermediate_visits_are_ignored() {
        let first = visit(date(2021, 1, 1), (-1.0, 0.0, 23.0), None);
        let middle = visit(date(2021, 7, 1), (-9.0, 0.0, 29.0), None);
        let last = visit(date(2023, 1, 1), (-2.0, 0.0, 23.2), None);

        let with_middle = compute_endpoint_progression(
            &[last.clone(), middle, first.clone()],
            &thresholds(),
            ProgressionWindow::AllHistoryEndpoints,
        );
        let without_middle = compute_endpoint_progression(
            &[first, last],
            &thresholds(),
            ProgressionWindow::AllHistoryEndpoints,
        );

        assert_eq!(with_middle.se_rate, without_middle.se_rate);
        assert_eq!(with_middle.al_rate, without_middle.al_rate);
        assert_eq!(with_middle.risk_level, without_middle.risk_level);
    }

    #[test]
    fn last_two_window_uses_most_recent_pair() {
        let visits = vec![
            visit(date(2024, 1, 1), (-3.0, 0.0, 24.2), None),
            visit(date(2020, 1, 1), (-1.0, 0.0, 23.0), None),
            visit(date(2023, 1, 1), (-3.0, 0.0, 24.0), None),
        ];

        let recent = compute_endpoint_progression(
            &visits,
            &thresholds(),
            ProgressionWindow::LastTwo,
        );
        assert_close(recent.se_rate.od, 0.0);
        assert_close(recent.al_rate.od, 0.20);
        assert_eq!(recent.window, ProgressionWindow::LastTwo);

        let whole = compute_endpoint_progression(
            &visits,
            &thresholds(),
            ProgressionWindow::AllHistoryEndpoints,
        );
        assert_close(whole.se_rate.od, -0.5);
    }

    #[test]
    fn missing_endpoint_values_drop_only_that_rate() {
        let first = visit(date(2022, 1, 1), (-2.0, 0.0, 24.0), Some((-1.0, 0.0, 23.0)));
        let mut last = visit(date(2023, 1, 1), (-2.5, 0.0, 24.1), Some((-1.5, 0.0, 23.1)));
        last.set_refraction(Eye::Os, None, Some(-0.5));
        last.set_axial_length(Eye::Od, None);

        let result = compute_endpoint_progression(
            &[first, last],
            &thresholds(),
            ProgressionWindow::AllHistoryEndpoints,
        );

        assert_close(result.se_rate.od, -0.5);
        assert_eq!(result.se_rate.os, None);
        assert_eq!(result.al_rate.od, None);
        assert_close(result.al_rate.os, 0.1);
    }

    #[test]
    fn se_alone_can_raise_the_summary_tier() {
        let visits = vec![
            visit(date(2022, 1, 1), (-1.0, 0.0, 24.0), None),
            visit(date(2023, 1, 1), (-2.0, 0.0, 24.05), None),
        ];
        let result = compute_endpoint_progression(
            &visits,
            &thresholds(),
            ProgressionWindow::AllHistoryEndpoints,
        );
        assert_eq!(result.risk_level, RiskLevel::Yellow);
    }

    #[test]
    fn reliability_tiers_follow_span() {
        assert_eq!(Reliability::from_years(0.3), Reliability::Low);
        assert_eq!(Reliability::from_years(0.5), Reliability::Low);
        assert_eq!(Reliability::from_years(0.75), Reliability::Medium);
        assert_eq!(Reliability::from_years(1.0), Reliability::Medium);
        assert_eq!(Reliability::from_years(1.5), Reliability::High);
    }

    #[test]
    fn pairwise_rate_between_adjacent_visits() {
        let previous = visit(date(2023, 1, 1), (-2.0, -1.0, 24.0), None);
        let current = visit(date(2023, 7, 2), (-2.5, -1.0, 24.2), None);

        let rates = compute_pairwise_progression(&previous, &current).expect("ordered visits");
        assert_close(rates.se.od, -1.0);
        assert_close(rates.al.od, 0.4);
        assert_eq!(rates.se.os, None);
    }

    #[test]
    fn pairwise_same_day_has_no_rates() {
        let previous = visit(date(2023, 1, 1), (-2.0, 0.0, 24.0), None);
        let current = visit(date(2023, 1, 1), (-2.5, 0.0, 24.5), None);

        let rates = compute_pairwise_progression(&previous, &current).expect("same day is ok");
        assert!(rates.is_empty());
    }

    #[test]
    fn pairwise_rejects_reversed_visits() {
        let earlier = visit(date(2023, 1, 1), (-2.0, 0.0, 24.0), None);
        let later = visit(date(2024, 1, 1), (-2.5, 0.0, 24.5), None);

        let err = compute_pairwise_progression(&later, &earlier)
            .expect_err("reversed visits should be rejected");
        assert!(matches!(err, MyopiaError::VisitsOutOfOrder { .. }));
    }

    #[test]
    fn history_rows_carry_their_own_interval() {
        let visits = vec![
            visit(date(2023, 1, 1), (-2.0, 0.0, 24.0), None),
            visit(date(2022, 1, 1), (-1.0, 0.0, 23.5), None),
            visit(date(2023, 1, 1), (-2.0, 0.0, 24.0), None),
            visit(date(2023, 7, 2), (-2.2, 0.0, 24.35), None),
        ];

        let rows = annotate_visit_history(&visits, &thresholds());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].date, date(2022, 1, 1));
        assert!(rows[0].interval.is_none());

        let first = rows[1].interval.as_ref().expect("second row has an interval");
        assert_close(first.rates.se.od, -1.0);
        assert_eq!(first.risk_level, RiskLevel::Yellow);

        let tie = rows[2].interval.as_ref().expect("tied row still has an interval");
        assert_eq!(tie.years_elapsed, 0.0);
        assert!(tie.rates.is_empty());
        assert_eq!(tie.risk_level, RiskLevel::Normal);

        let last = rows[3].interval.as_ref().expect("last row has an interval");
        assert_close(last.rates.al.od, 0.7);
        assert_eq!(last.risk_level, RiskLevel::Red);
    }
}
