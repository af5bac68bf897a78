//! Error types for the neurograsp core
//!
//! These errors work in `no_std` environments and carry enough context to be
//! reported without further lookups.

use core::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Sensitivity Errors
// ============================================================================

/// Errors from validating an action-sensitivity vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensitivityError {
    /// Vector length differs from the number of active non-neutral actions
    LengthMismatch {
        /// Number of active non-neutral actions
        expected: usize,
        /// Length of the supplied vector
        got: usize,
    },
    /// An element lies outside [1, 10]
    InvalidRange {
        /// Position of the offending element
        index: usize,
        /// The offending value
        value: i32,
    },
}

impl fmt::Display for SensitivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { expected, got } => {
                write!(f, "Sensitivity length mismatch: expected {expected} values, got {got}")
            }
            Self::InvalidRange { index, value } => {
                write!(f, "Sensitivity value {value} at slot {index} outside 1..=10")
            }
        }
    }
}

// ============================================================================
// Threshold Errors
// ============================================================================

/// Errors from constructing a power threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThresholdError {
    /// Value is NaN or outside [0, 1]
    OutOfRange {
        /// Rejected value
        value: f64,
    },
}

impl fmt::Display for ThresholdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { value } => {
                write!(f, "Power threshold {value} outside 0.0..=1.0")
            }
        }
    }
}

// ============================================================================
// Protocol Errors
// ============================================================================

/// Errors in the actuator wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolError {
    /// Command codes must be a single printable ASCII character
    InvalidCode {
        /// Rejected byte
        code: u8,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCode { code } => {
                write!(f, "Invalid command code 0x{code:02X}: must be printable ASCII")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SensitivityError {}

#[cfg(feature = "std")]
impl std::error::Error for ThresholdError {}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}
