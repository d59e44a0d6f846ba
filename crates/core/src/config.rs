//! Clinic settings.
//!
//! Settings are resolved once at process startup and then passed into the engine and the
//! report service. Nothing in this crate reads environment variables while handling a
//! request; callers hand in the values they read at startup.

use crate::error::{MyopiaError, MyopiaResult};
use crate::note::NoteTemplateConfig;
use crate::risk::RiskThresholdConfig;
use crate::timeline::TreatmentColorMap;
use crate::validation::validate_thresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-clinic configuration consumed by the engine.
///
/// Any section missing from a settings file takes its default. A section that is present is
/// used as written; in particular an empty `note_template.enabled_fields` stays empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClinicSettings {
    pub thresholds: RiskThresholdConfig,
    pub treatment_colors: TreatmentColorMap,
    pub note_template: NoteTemplateConfig,
}

impl ClinicSettings {
    /// Parses and validates settings from YAML.
    ///
    /// # Errors
    ///
    /// - `MyopiaError::YamlDeserialization` for malformed YAML, unknown keys, bad colours or
    ///   an incomplete treatment colour map.
    /// - `MyopiaError::InvalidSettings` for unusable thresholds.
    pub fn from_yaml_str(yaml: &str) -> MyopiaResult<Self> {
        let settings: ClinicSettings =
            serde_yaml::from_str(yaml).map_err(MyopiaError::YamlDeserialization)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a YAML file.
    pub fn load(path: &Path) -> MyopiaResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(MyopiaError::FileRead)?;
        let settings = Self::from_yaml_str(&yaml)?;
        tracing::info!(path = %path.display(), "loaded clinic settings");
        Ok(settings)
    }

    /// Loads settings from `path`, or returns the defaults when no path is configured.
    pub fn load_or_default(path: Option<&Path>) -> MyopiaResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                tracing::info!("no clinic settings file configured; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> MyopiaResult<()> {
        validate_thresholds(&self.thresholds)
    }

    pub fn to_yaml(&self) -> MyopiaResult<String> {
        serde_yaml::to_string(self).map_err(MyopiaError::YamlSerialization)
    }
}

/// Resolves a configured file path without reading environment variables.
///
/// An explicit `override_path` wins; otherwise `env_value` (the value of
/// [`SETTINGS_PATH_ENV`](crate::constants::SETTINGS_PATH_ENV) read by the caller) is used
/// if non-blank. The same rule resolves the records file path.
pub fn resolve_path(
    override_path: Option<PathBuf>,
    env_value: Option<String>,
) -> Option<PathBuf> {
    override_path.or_else(|| {
        env_value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}
