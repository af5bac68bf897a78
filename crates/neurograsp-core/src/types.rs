//! Core types for the neurograsp bridge
//!
//! This module provides the data shared by every tier of the system:
//! - Mental-command events as emitted by the streaming source
//! - The power threshold that gates those events
//! - Profile operations and data-stream names understood by the source

use alloc::string::String;

use serde::{Deserialize, Serialize};

/// Label of the baseline mental command. Never counts as a trained action.
pub const NEUTRAL_ACTION: &str = "neutral";

// ============================================================================
// Command Events
// ============================================================================

/// A single mental-command detection.
///
/// Produced continuously by the streaming source once the `com` stream is
/// subscribed. The wire form matches the source:
/// `{"action": "lift", "power": 0.85, "time": 1647525819.0223}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandEvent {
    /// Detected action label
    pub action: String,
    /// Detection strength in [0, 1]
    #[serde(default)]
    pub power: f64,
    /// Source timestamp in seconds
    #[serde(default)]
    pub time: f64,
}

impl CommandEvent {
    /// Create a new event.
    #[must_use]
    pub fn new(action: impl Into<String>, power: f64, time: f64) -> Self {
        Self {
            action: action.into(),
            power,
            time,
        }
    }

    /// Check whether this is the baseline (neutral) action.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.action == NEUTRAL_ACTION
    }
}

// ============================================================================
// Power Threshold
// ============================================================================

/// Power level an event must strictly exceed to trigger the actuator.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PowerThreshold(f64);

impl PowerThreshold {
    /// Value used whenever no valid threshold is available
    pub const DEFAULT: Self = Self(0.5);

    /// Every event triggers (testing only)
    pub const ALWAYS: Self = Self(0.0);

    /// No event can trigger (testing only)
    pub const NEVER: Self = Self(1.0);

    /// Create a threshold, rejecting values outside [0, 1] and NaN.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Raw threshold value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Sensitivity band this threshold falls into.
    #[must_use]
    pub fn band(self) -> ThresholdBand {
        if self.0 < 0.3 {
            ThresholdBand::VerySensitive
        } else if self.0 < 0.6 {
            ThresholdBand::Medium
        } else {
            ThresholdBand::LessSensitive
        }
    }
}

impl Default for PowerThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for PowerThreshold {
    type Error = crate::error::ThresholdError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(crate::error::ThresholdError::OutOfRange { value })
    }
}

impl From<PowerThreshold> for f64 {
    fn from(threshold: PowerThreshold) -> Self {
        threshold.0
    }
}

/// How easily a threshold lets the target action fire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThresholdBand {
    /// Below 0.3: fires with minimal effort, may fire accidentally
    VerySensitive,
    /// 0.3 up to 0.6: requires focused effort
    Medium,
    /// 0.6 and above: requires strong focus
    LessSensitive,
}

impl ThresholdBand {
    /// Short human-readable description.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::VerySensitive => "very sensitive - may trigger easily",
            Self::Medium => "medium sensitivity - balanced",
            Self::LessSensitive => "less sensitive - requires strong focus",
        }
    }
}

/// Named threshold presets offered by the tuning tool.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThresholdPreset {
    /// 0.2
    VerySensitive,
    /// 0.4
    Sensitive,
    /// 0.6
    Balanced,
    /// 0.8
    LessSensitive,
}

impl ThresholdPreset {
    /// All presets, most sensitive first.
    pub const ALL: [Self; 4] = [
        Self::VerySensitive,
        Self::Sensitive,
        Self::Balanced,
        Self::LessSensitive,
    ];

    /// Threshold value of this preset.
    #[must_use]
    pub const fn threshold(self) -> PowerThreshold {
        match self {
            Self::VerySensitive => PowerThreshold(0.2),
            Self::Sensitive => PowerThreshold(0.4),
            Self::Balanced => PowerThreshold(0.6),
            Self::LessSensitive => PowerThreshold(0.8),
        }
    }

    /// Preset name as accepted on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::VerySensitive => "very-sensitive",
            Self::Sensitive => "sensitive",
            Self::Balanced => "balanced",
            Self::LessSensitive => "less-sensitive",
        }
    }

    /// Look a preset up by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.name() == name)
    }
}

// ============================================================================
// Profile Operations and Streams
// ============================================================================

/// Operation requested on a detection profile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileOp {
    /// Load the profile into the session
    Load,
    /// Unload the profile from the session
    Unload,
    /// Persist the profile (including sensitivity changes)
    Save,
    /// Create a new, untrained profile
    Create,
}

impl ProfileOp {
    /// Wire name of the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Unload => "unload",
            Self::Save => "save",
            Self::Create => "create",
        }
    }
}

/// Data stream offered by the streaming source.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataStream {
    /// Mental command detections
    #[serde(rename = "com")]
    MentalCommand,
    /// Facial expression detections
    #[serde(rename = "fac")]
    FacialExpression,
    /// Training events
    #[serde(rename = "sys")]
    System,
}

impl DataStream {
    /// Wire name of the stream.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MentalCommand => "com",
            Self::FacialExpression => "fac",
            Self::System => "sys",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
