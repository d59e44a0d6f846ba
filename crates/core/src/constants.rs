//! Constants used throughout the myopia core crate.
//!
//! Clinical cut-offs and clinic defaults are collected here so that the engine modules and
//! the settings layer agree on a single value for each.

/// Days per year used for every age and elapsed-time conversion.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Shortest span, in days, over which an endpoint progression rate is reported.
///
/// Shorter spans divide measurement noise by a near-zero interval.
pub const MIN_PROGRESSION_INTERVAL_DAYS: i64 = 28;

/// Spans longer than this many years are reported with high reliability.
pub const HIGH_RELIABILITY_YEARS: f64 = 1.0;

/// Spans longer than this many years are reported with medium reliability.
pub const MEDIUM_RELIABILITY_YEARS: f64 = 0.5;

/// Default SE thresholds, D/yr magnitude.
pub const DEFAULT_SE_YELLOW: f64 = 0.75;
pub const DEFAULT_SE_RED: f64 = 1.50;

/// Default AL thresholds, mm/yr.
pub const DEFAULT_AL_YELLOW: f64 = 0.30;
pub const DEFAULT_AL_RED: f64 = 0.60;

/// Colour used for unset or unrecognised treatment methods, as RGB channels (`#9e9e9e`).
pub const DEFAULT_FALLBACK_RGB: (u8, u8, u8) = (0x9e, 0x9e, 0x9e);

/// Opacity of closed treatment segments.
pub const CLOSED_SEGMENT_OPACITY: f64 = 0.18;

/// Opacity of the open segment running to the patient's current age.
pub const CURRENT_SEGMENT_OPACITY: f64 = 0.35;

/// Placeholder for an enabled note field whose source data is missing.
pub const NOTE_NOT_AVAILABLE: &str = "not available";

/// Placeholder for a single missing eye inside an otherwise populated note line.
pub const NOTE_EYE_NOT_AVAILABLE: &str = "n/a";

/// Output when a clinic has enabled no note fields at all.
pub const NOTE_NO_FIELDS_SELECTED: &str = "No note fields selected.";

/// Environment variable naming the clinic settings YAML file.
pub const SETTINGS_PATH_ENV: &str = "MYOPIA_SETTINGS";

/// Environment variable naming the records YAML file.
pub const RECORDS_PATH_ENV: &str = "MYOPIA_RECORDS";
