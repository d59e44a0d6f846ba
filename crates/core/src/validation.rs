//! Input validation utilities.
//!
//! Checks applied to clinic settings and patient records as they enter the crate. Clinical
//! measurements themselves are never range-checked; implausible values are accepted as
//! recorded.

use crate::error::{MyopiaError, MyopiaResult};
use crate::risk::{AxisThresholds, RiskThresholdConfig};

/// Validates clinic risk thresholds.
///
/// Boundaries must be finite and non-negative. A red boundary below its yellow boundary is
/// allowed, because the classifier handles it deterministically, but it is logged.
///
/// # Errors
///
/// Returns `MyopiaError::InvalidSettings` naming the offending axis and boundary.
pub fn validate_thresholds(thresholds: &RiskThresholdConfig) -> MyopiaResult<()> {
    validate_axis("se", &thresholds.se)?;
    validate_axis("al", &thresholds.al)
}

fn validate_axis(axis: &str, t: &AxisThresholds) -> MyopiaResult<()> {
    for (name, value) in [("yellow", t.yellow), ("red", t.red)] {
        if !value.is_finite() || value < 0.0 {
            return Err(MyopiaError::InvalidSettings(format!(
                "{axis}.{name} threshold must be a finite, non-negative number, got {value}"
            )));
        }
    }

    if t.red < t.yellow {
        tracing::warn!(
            axis,
            yellow = t.yellow,
            red = t.red,
            "red threshold is below yellow; red is evaluated first"
        );
    }

    Ok(())
}

/// Validates a patient display name.
///
/// # Errors
///
/// Returns `MyopiaError::InvalidInput` if the name is empty or spans multiple lines.
pub fn validate_patient_name(name: &str) -> MyopiaResult<()> {
    if name.trim().is_empty() {
        return Err(MyopiaError::InvalidInput(
            "patient name cannot be empty".into(),
        ));
    }
    if name.contains(['\n', '\r']) {
        return Err(MyopiaError::InvalidInput(
            "patient name must be a single line".into(),
        ));
    }
    Ok(())
}
