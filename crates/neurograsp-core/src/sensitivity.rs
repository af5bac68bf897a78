//! Action-sensitivity vectors
//!
//! A detection profile carries one sensitivity knob per trained non-neutral
//! action. The number of slots is whatever the loaded profile reports as
//! active, so it is always queried, never assumed.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::SensitivityError;
use crate::types::NEUTRAL_ACTION;

/// Least sensitive setting.
pub const MIN_SENSITIVITY: i32 = 1;

/// Most sensitive setting.
pub const MAX_SENSITIVITY: i32 = 10;

/// Level applied to every slot unless configured otherwise.
pub const DEFAULT_SENSITIVITY: u8 = 5;

/// A validated sensitivity vector. Every element is in [1, 10].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SensitivityVector(Vec<u8>);

impl SensitivityVector {
    /// Values, one per active non-neutral action.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the profile has no non-neutral actions.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Validate raw sensitivity values against the active slot count.
///
/// # Errors
///
/// Returns [`SensitivityError::LengthMismatch`] when `values.len()` differs
/// from `expected_len`, or [`SensitivityError::InvalidRange`] for the first
/// element outside [1, 10].
pub fn validate(values: &[i32], expected_len: usize) -> Result<SensitivityVector, SensitivityError> {
    if values.len() != expected_len {
        return Err(SensitivityError::LengthMismatch {
            expected: expected_len,
            got: values.len(),
        });
    }

    let mut checked = Vec::with_capacity(values.len());
    for (index, &value) in values.iter().enumerate() {
        if !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&value) {
            return Err(SensitivityError::InvalidRange { index, value });
        }
        // Range check above guarantees the cast is lossless
        checked.push(value as u8);
    }

    Ok(SensitivityVector(checked))
}

/// Count the active actions that own a sensitivity slot.
#[must_use]
pub fn active_slot_count<S: AsRef<str>>(actions: &[S]) -> usize {
    actions
        .iter()
        .filter(|action| action.as_ref() != NEUTRAL_ACTION)
        .count()
}

// ============================================================================
// Sensitivity Plan
// ============================================================================

/// How the new sensitivity vector is chosen once the current one is read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityPlan {
    /// The same level on every active slot
    Uniform(u8),
    /// One explicit value per active non-neutral action
    Explicit(Vec<i32>),
}

impl SensitivityPlan {
    /// Build the candidate vector for `slots` active actions and validate it.
    ///
    /// # Errors
    ///
    /// Propagates [`validate`] failures; an explicit plan whose length does
    /// not match `slots` yields [`SensitivityError::LengthMismatch`].
    pub fn apply(&self, slots: usize) -> Result<SensitivityVector, SensitivityError> {
        match self {
            Self::Uniform(level) => {
                let candidate: Vec<i32> = (0..slots).map(|_| i32::from(*level)).collect();
                validate(&candidate, slots)
            }
            Self::Explicit(values) => validate(values, slots),
        }
    }
}

impl Default for SensitivityPlan {
    fn default() -> Self {
        Self::Uniform(DEFAULT_SENSITIVITY)
    }
}

// ============================================================================
// Tests
// ============================================================================
