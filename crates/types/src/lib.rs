//! Shared primitives for the myopia workspace.
//!
//! Per-eye values and validated display colours are used by the engine, the settings layer
//! and the CLI alike, so they live here rather than in `myopia-core`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur when creating validated primitive types.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The input was not a `#RRGGBB` hex colour.
    #[error("invalid colour '{0}' (expected #RRGGBB)")]
    InvalidColour(String),
}

/// One of the patient's two eyes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eye {
    /// Right eye (oculus dexter).
    Od,
    /// Left eye (oculus sinister).
    Os,
}

impl Eye {
    /// Both eyes, right first.
    pub const BOTH: [Eye; 2] = [Eye::Od, Eye::Os];

    /// Clinical label used in notes and tables.
    pub fn label(self) -> &'static str {
        match self {
            Eye::Od => "OD",
            Eye::Os => "OS",
        }
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A value held once per eye.
///
/// Most clinical quantities in this workspace are recorded independently for the right and
/// left eye. `EyePair` keeps both halves together so callers can map and combine them
/// without repeating OD/OS branches everywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EyePair<T> {
    pub od: T,
    pub os: T,
}

impl<T> EyePair<T> {
    pub fn new(od: T, os: T) -> Self {
        Self { od, os }
    }

    pub fn get(&self, eye: Eye) -> &T {
        match eye {
            Eye::Od => &self.od,
            Eye::Os => &self.os,
        }
    }

    pub fn get_mut(&mut self, eye: Eye) -> &mut T {
        match eye {
            Eye::Od => &mut self.od,
            Eye::Os => &mut self.os,
        }
    }

    /// Applies `f` to each eye, passing the eye alongside its value.
    pub fn map<U>(&self, mut f: impl FnMut(Eye, &T) -> U) -> EyePair<U> {
        EyePair {
            od: f(Eye::Od, &self.od),
            os: f(Eye::Os, &self.os),
        }
    }

    /// Combines two pairs eye by eye.
    pub fn zip_with<U, V>(
        &self,
        other: &EyePair<U>,
        mut f: impl FnMut(&T, &U) -> V,
    ) -> EyePair<V> {
        EyePair {
            od: f(&self.od, &other.od),
            os: f(&self.os, &other.os),
        }
    }

    /// Iterates `(eye, value)` in OD, OS order.
    pub fn iter(&self) -> impl Iterator<Item = (Eye, &T)> {
        [(Eye::Od, &self.od), (Eye::Os, &self.os)].into_iter()
    }
}

impl<T> EyePair<Option<T>> {
    /// Returns `true` when neither eye carries a value.
    pub fn is_empty(&self) -> bool {
        self.od.is_none() && self.os.is_none()
    }
}

/// A display colour in `#RRGGBB` form.
///
/// The input is trimmed and normalised to lowercase during construction, so two colours
/// compare equal regardless of how the clinic typed them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HexColor(String);

impl HexColor {
    /// Parses a `#RRGGBB` colour.
    ///
    /// # Errors
    ///
    /// Returns `TypesError::InvalidColour` if the trimmed input is not a `#` followed by exactly
    /// six hexadecimal digits.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let trimmed = input.as_ref().trim();
        let valid = trimmed.len() == 7
            && trimmed.starts_with('#')
            && trimmed[1..].bytes().all(|b| b.is_ascii_hexdigit());
        if !valid {
            return Err(TypesError::InvalidColour(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Builds a colour from its red, green and blue channels. Always valid.
    pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self(format!("#{red:02x}{green:02x}{blue:02x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HexColor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for HexColor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        HexColor::parse(&s).map_err(serde::de::Error::custom)
    }
}
