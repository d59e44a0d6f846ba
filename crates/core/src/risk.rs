//! Risk classification.
//!
//! [`classify_risk`] is the single classifier used by the endpoint summary, the per-interval
//! history rows and chart point colouring. It always looks at both axes and both eyes and
//! reports the worst tier any of them reaches.

use crate::constants::{DEFAULT_AL_RED, DEFAULT_AL_YELLOW, DEFAULT_SE_RED, DEFAULT_SE_YELLOW};
use crate::progression::ProgressionRates;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk tier, ordered by severity.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Normal,
    Yellow,
    Red,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Normal => "NORMAL",
            RiskLevel::Yellow => "YELLOW",
            RiskLevel::Red => "RED",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Yellow and red boundaries for one axis, per year.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisThresholds {
    pub yellow: f64,
    pub red: f64,
}

impl AxisThresholds {
    /// Tier for a single comparable value. Red is tested first, so a configuration with
    /// `red < yellow` still yields a deterministic answer.
    fn tier(&self, value: f64) -> RiskLevel {
        if value >= self.red {
            RiskLevel::Red
        } else if value >= self.yellow {
            RiskLevel::Yellow
        } else {
            RiskLevel::Normal
        }
    }
}

/// Clinic thresholds for SE (D/yr magnitude) and AL (mm/yr).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholdConfig {
    pub se: AxisThresholds,
    pub al: AxisThresholds,
}

impl Default for RiskThresholdConfig {
    fn default() -> Self {
        Self {
            se: AxisThresholds {
                yellow: DEFAULT_SE_YELLOW,
                red: DEFAULT_SE_RED,
            },
            al: AxisThresholds {
                yellow: DEFAULT_AL_YELLOW,
                red: DEFAULT_AL_RED,
            },
        }
    }
}

/// Maps progression rates to the worst risk tier reached by any eye on any axis.
///
/// - SE rates are compared by absolute magnitude, since myopic progression is negative.
/// - AL rates are compared by signed value; a shrinking eye never raises the tier.
/// - Absent and non-finite rates are skipped, so partial data degrades to a lower tier
///   instead of failing.
pub fn classify_risk(rates: &ProgressionRates, thresholds: &RiskThresholdConfig) -> RiskLevel {
    let se = rates
        .se
        .iter()
        .filter_map(|(_, rate)| *rate)
        .filter(|rate| rate.is_finite())
        .map(|rate| thresholds.se.tier(rate.abs()));

    let al = rates
        .al
        .iter()
        .filter_map(|(_, rate)| *rate)
        .filter(|rate| rate.is_finite())
        .map(|rate| thresholds.al.tier(rate));

    se.chain(al).max().unwrap_or(RiskLevel::Normal)
}
