//! Stroke taxonomy and the session-level stroke selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// StrokeType
// ---------------------------------------------------------------------------

/// The fixed set of strokes the analysis recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeType {
    Serve,
    Dink,
    Groundstroke,
    Overhead,
    Volley,
}

impl StrokeType {
    pub const ALL: [StrokeType; 5] = [
        StrokeType::Serve,
        StrokeType::Dink,
        StrokeType::Groundstroke,
        StrokeType::Overhead,
        StrokeType::Volley,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            StrokeType::Serve => "serve",
            StrokeType::Dink => "dink",
            StrokeType::Groundstroke => "groundstroke",
            StrokeType::Overhead => "overhead",
            StrokeType::Volley => "volley",
        }
    }

    /// Strokes that should be driven through the kinetic chain.
    pub const fn is_power_stroke(self) -> bool {
        matches!(
            self,
            StrokeType::Serve | StrokeType::Groundstroke | StrokeType::Overhead
        )
    }
}

impl fmt::Display for StrokeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrokeType {
    type Err = CoreError;

    /// Strict parse. Accepts the canonical names plus `drive` and `dinking`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serve" => Ok(StrokeType::Serve),
            "dink" | "dinking" => Ok(StrokeType::Dink),
            "groundstroke" | "drive" => Ok(StrokeType::Groundstroke),
            "overhead" => Ok(StrokeType::Overhead),
            "volley" => Ok(StrokeType::Volley),
            _ => Err(CoreError::UnknownStrokeType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// StrokeClass
// ---------------------------------------------------------------------------

/// Per-frame classification label: a stroke, or `unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeClass {
    Serve,
    Dink,
    Groundstroke,
    Overhead,
    Volley,
    Unknown,
}

impl StrokeClass {
    pub const fn stroke_type(self) -> Option<StrokeType> {
        match self {
            StrokeClass::Serve => Some(StrokeType::Serve),
            StrokeClass::Dink => Some(StrokeType::Dink),
            StrokeClass::Groundstroke => Some(StrokeType::Groundstroke),
            StrokeClass::Overhead => Some(StrokeType::Overhead),
            StrokeClass::Volley => Some(StrokeType::Volley),
            StrokeClass::Unknown => None,
        }
    }
}

impl From<StrokeType> for StrokeClass {
    fn from(value: StrokeType) -> Self {
        match value {
            StrokeType::Serve => StrokeClass::Serve,
            StrokeType::Dink => StrokeClass::Dink,
            StrokeType::Groundstroke => StrokeClass::Groundstroke,
            StrokeType::Overhead => StrokeClass::Overhead,
            StrokeType::Volley => StrokeClass::Volley,
        }
    }
}

// ---------------------------------------------------------------------------
// StrokeSelector
// ---------------------------------------------------------------------------

/// What the user declared the recording contains.
///
/// A specific stroke acts as a classification hint and drives the
/// stroke-dependent risk rules; `Overall` (also used for `none`, empty or
/// unrecognised input) means no hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StrokeSelector {
    Stroke(StrokeType),
    #[default]
    Overall,
}

impl StrokeSelector {
    /// Lenient parse: anything that is not a known stroke is `Overall`.
    pub fn parse(s: &str) -> Self {
        s.parse::<StrokeType>()
            .map(StrokeSelector::Stroke)
            .unwrap_or(StrokeSelector::Overall)
    }

    pub const fn hint(self) -> Option<StrokeType> {
        match self {
            StrokeSelector::Stroke(t) => Some(t),
            StrokeSelector::Overall => None,
        }
    }

    pub fn is(self, stroke: StrokeType) -> bool {
        self.hint() == Some(stroke)
    }
}

impl fmt::Display for StrokeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrokeSelector::Stroke(t) => f.write_str(t.as_str()),
            StrokeSelector::Overall => f.write_str("overall"),
        }
    }
}

impl From<String> for StrokeSelector {
    fn from(value: String) -> Self {
        StrokeSelector::parse(&value)
    }
}

impl From<StrokeSelector> for String {
    fn from(value: StrokeSelector) -> Self {
        value.to_string()
    }
}
