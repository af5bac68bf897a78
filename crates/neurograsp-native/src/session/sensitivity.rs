//! Sensitivity configurator.
//!
//! The slot count comes from the active actions the loaded profile reports.
//! It is recorded from the active-action callback before any read, and a
//! vector is only written once it validates against that count. The list is
//! forgotten whenever a profile is loaded or unloaded so a later profile never
//! inherits it.

use neurograsp_core::error::SensitivityError;
use neurograsp_core::sensitivity::{self, active_slot_count, SensitivityPlan, SensitivityVector};

use crate::cortex::{ClientResult, StreamingClient};

/// Reads, validates and writes action-sensitivity vectors.
#[derive(Clone, Debug, Default)]
pub struct SensitivityConfigurator {
    plan: SensitivityPlan,
    active_actions: Option<Vec<String>>,
}

impl SensitivityConfigurator {
    /// Configurator that writes vectors built from `plan`.
    #[must_use]
    pub fn new(plan: SensitivityPlan) -> Self {
        Self {
            plan,
            active_actions: None,
        }
    }

    /// How new vectors are chosen.
    #[must_use]
    pub fn plan(&self) -> &SensitivityPlan {
        &self.plan
    }

    /// Record the active actions of the loaded profile.
    pub fn record_active_actions(&mut self, actions: Vec<String>) {
        tracing::info!("Active actions: {:?}", actions);
        self.active_actions = Some(actions);
    }

    /// Forget the recorded active actions.
    pub fn clear_active_actions(&mut self) {
        self.active_actions = None;
    }

    /// Whether the loaded profile has reported its active actions.
    #[must_use]
    pub fn has_active_actions(&self) -> bool {
        self.active_actions.is_some()
    }

    /// Active actions, including neutral, once reported.
    #[must_use]
    pub fn active_actions(&self) -> Option<&[String]> {
        self.active_actions.as_deref()
    }

    /// Number of sensitivity slots; zero until actions are reported.
    #[must_use]
    pub fn slots(&self) -> usize {
        self.active_actions.as_deref().map_or(0, active_slot_count)
    }

    /// Request the current vector.
    pub fn read<C: StreamingClient + ?Sized>(&self, client: &mut C, profile: &str) -> ClientResult<()> {
        client.get_sensitivity(profile)
    }

    /// Validate raw values against an expected slot count.
    ///
    /// # Errors
    ///
    /// [`SensitivityError::LengthMismatch`] or [`SensitivityError::InvalidRange`].
    pub fn validate(
        &self,
        values: &[i32],
        expected_len: usize,
    ) -> Result<SensitivityVector, SensitivityError> {
        sensitivity::validate(values, expected_len)
    }

    /// Build the vector to write after reading `current`.
    ///
    /// # Errors
    ///
    /// Returns the validation failure when the plan does not fit the active
    /// slot count.
    pub fn next_vector(&self, current: &[i32]) -> Result<SensitivityVector, SensitivityError> {
        let slots = self.slots();
        if current.len() != slots {
            tracing::warn!(
                "Source reported {} sensitivity values for {} active actions",
                current.len(),
                slots
            );
        }

        let vector = self.plan.apply(slots)?;
        tracing::info!("Sensitivity {:?} -> {:?}", current, vector.as_slice());
        Ok(vector)
    }

    /// Request persistence of a validated vector.
    pub fn write<C: StreamingClient + ?Sized>(
        &self,
        client: &mut C,
        profile: &str,
        vector: &SensitivityVector,
    ) -> ClientResult<()> {
        client.set_sensitivity(profile, vector.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cortex::Request;
    use crate::session::tests::RecordingClient;

    fn configured(plan: SensitivityPlan, actions: &[&str]) -> SensitivityConfigurator {
        let mut sensitivity = SensitivityConfigurator::new(plan);
        sensitivity.record_active_actions(actions.iter().map(|s| (*s).to_string()).collect());
        sensitivity
    }

    #[test]
    fn test_slots_exclude_neutral() {
        let sensitivity = configured(SensitivityPlan::default(), &["neutral", "lift", "push"]);
        assert_eq!(sensitivity.slots(), 2);
    }

    #[test]
    fn test_actions_unknown_until_recorded_and_after_clear() {
        let mut sensitivity = SensitivityConfigurator::default();
        assert!(!sensitivity.has_active_actions());
        assert_eq!(sensitivity.active_actions(), None);
        assert_eq!(sensitivity.slots(), 0);

        sensitivity.record_active_actions(vec!["neutral".into(), "lift".into()]);
        assert!(sensitivity.has_active_actions());
        assert_eq!(sensitivity.slots(), 1);

        sensitivity.clear_active_actions();
        assert!(!sensitivity.has_active_actions());
        assert_eq!(sensitivity.slots(), 0);
    }

    #[test]
    fn test_uniform_plan_fills_every_slot() {
        let sensitivity = configured(SensitivityPlan::Uniform(5), &["neutral", "lift", "drop"]);
        let vector = sensitivity.next_vector(&[3, 7]).unwrap();
        assert_eq!(vector.as_slice(), &[5, 5]);
    }

    #[test]
    fn test_slot_count_wins_over_reported_length() {
        let sensitivity = configured(SensitivityPlan::Uniform(7), &["neutral", "lift"]);
        let vector = sensitivity.next_vector(&[3, 7, 2, 2]).unwrap();
        assert_eq!(vector.as_slice(), &[7]);
    }

    #[test]
    fn test_explicit_plan_length_checked() {
        let sensitivity = configured(SensitivityPlan::Explicit(vec![4, 6]), &["neutral", "lift"]);
        assert_eq!(
            sensitivity.next_vector(&[5]),
            Err(SensitivityError::LengthMismatch { expected: 1, got: 2 })
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let sensitivity = SensitivityConfigurator::default();
        assert_eq!(
            sensitivity.validate(&[5, 11], 2),
            Err(SensitivityError::InvalidRange { index: 1, value: 11 })
        );
        assert!(sensitivity.validate(&[1, 10], 2).is_ok());
    }

    #[test]
    fn test_read_and_write_requests() {
        let sensitivity = configured(SensitivityPlan::Uniform(5), &["neutral", "lift"]);
        let vector = sensitivity.next_vector(&[3]).unwrap();

        let mut client = RecordingClient::default();
        sensitivity.read(&mut client, "Arm-1").unwrap();
        sensitivity.write(&mut client, "Arm-1", &vector).unwrap();

        assert_eq!(
            client.requests,
            vec![
                Request::GetSensitivity {
                    profile: "Arm-1".into()
                },
                Request::SetSensitivity {
                    profile: "Arm-1".into(),
                    values: vec![5],
                },
            ]
        );
    }
}
