//! Mental-command to actuator translation.
//!
//! Every incoming [`CommandEvent`] is classified against the current power
//! threshold. Only the configured target action can trigger, and only when its
//! power strictly exceeds the threshold.

use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::protocol::{ActuatorCode, DeviceCommand};
use crate::types::{CommandEvent, PowerThreshold};

/// Action that drives the gripper unless configured otherwise.
pub const DEFAULT_TARGET_ACTION: &str = "lift";

// ============================================================================
// Threshold Source
// ============================================================================

/// Provider of the current power threshold.
///
/// Implementations are read on every event and may be updated by an
/// independent tuning tool at any time. A reader may observe a stale value;
/// when nothing valid can be read it must return a fallback instead of
/// failing.
pub trait ThresholdSource {
    /// Threshold to apply to the next event.
    fn current(&self) -> PowerThreshold;
}

/// A threshold that never changes.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FixedThreshold(pub PowerThreshold);

impl ThresholdSource for FixedThreshold {
    fn current(&self) -> PowerThreshold {
        self.0
    }
}

impl<T: ThresholdSource + ?Sized> ThresholdSource for &T {
    fn current(&self) -> PowerThreshold {
        (**self).current()
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Outcome of classifying one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// The target action fired above threshold
    Trigger(String),
    /// Anything else, including the neutral baseline
    Suppress,
}

impl Classification {
    /// Check if this is a trigger.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger(_))
    }
}

/// Classifies command events and maps triggers to device commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTranslator {
    target_action: String,
    command: DeviceCommand,
}

impl CommandTranslator {
    /// Translator firing `command` whenever `target_action` exceeds threshold.
    #[must_use]
    pub fn new(target_action: impl Into<String>, command: DeviceCommand) -> Self {
        Self {
            target_action: target_action.into(),
            command,
        }
    }

    /// Action label that can trigger.
    #[must_use]
    pub fn target_action(&self) -> &str {
        &self.target_action
    }

    /// Command emitted on trigger.
    #[must_use]
    pub fn command(&self) -> &DeviceCommand {
        &self.command
    }

    /// Classify an event against a threshold.
    ///
    /// The threshold is an exclusive lower bound: `power == threshold`
    /// suppresses.
    #[must_use]
    pub fn classify(&self, event: &CommandEvent, threshold: PowerThreshold) -> Classification {
        if event.action == self.target_action && event.power > threshold.value() {
            Classification::Trigger(event.action.clone())
        } else {
            Classification::Suppress
        }
    }

    /// Classify an event using the source's current threshold and return the
    /// command to send, if any.
    pub fn translate<T: ThresholdSource + ?Sized>(
        &self,
        event: &CommandEvent,
        source: &T,
    ) -> Option<DeviceCommand> {
        match self.classify(event, source.current()) {
            Classification::Trigger(_) => Some(self.command.clone()),
            Classification::Suppress => None,
        }
    }
}

impl Default for CommandTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_ACTION, DeviceCommand::from(ActuatorCode::Grab))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    fn threshold(value: f64) -> PowerThreshold {
        PowerThreshold::new(value).unwrap()
    }

    #[test]
    fn test_lift_above_threshold_triggers() {
        let translator = CommandTranslator::default();
        let event = CommandEvent::new("lift", 0.85, 1_647_525_819.0);
        assert_eq!(
            translator.classify(&event, threshold(0.5)),
            Classification::Trigger("lift".into())
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let translator = CommandTranslator::default();
        let event = CommandEvent::new("lift", 0.5, 0.0);
        assert_eq!(translator.classify(&event, threshold(0.5)), Classification::Suppress);
    }

    #[test]
    fn test_power_just_above_threshold_triggers() {
        let translator = CommandTranslator::default();
        let event = CommandEvent::new("lift", 0.500_000_01, 0.0);
        assert!(translator.classify(&event, threshold(0.5)).is_trigger());

        let event = CommandEvent::new("lift", 0.499_999_99, 0.0);
        assert!(!translator.classify(&event, threshold(0.5)).is_trigger());
    }

    #[test]
    fn test_trigger_iff_power_exceeds_threshold() {
        let translator = CommandTranslator::default();
        let steps = [0.0_f64, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0];
        for &t in &steps {
            for &p in &steps {
                let event = CommandEvent::new("lift", p, 0.0);
                assert_eq!(translator.classify(&event, threshold(t)).is_trigger(), p > t);
            }
        }
    }

    #[test]
    fn test_non_target_actions_suppress() {
        let translator = CommandTranslator::default();
        for action in ["neutral", "push", "Lift", ""] {
            for power in [0.0_f64, 0.6, 1.0] {
                let event = CommandEvent::new(action, power, 0.0);
                assert_eq!(
                    translator.classify(&event, PowerThreshold::ALWAYS),
                    Classification::Suppress
                );
            }
        }
    }

    #[test]
    fn test_never_threshold_blocks_full_power() {
        let translator = CommandTranslator::default();
        let event = CommandEvent::new("lift", 1.0, 0.0);
        assert!(!translator.classify(&event, PowerThreshold::NEVER).is_trigger());
    }

    #[test]
    fn test_translate_emits_configured_command() {
        let translator = CommandTranslator::new("push", DeviceCommand::reset());
        let source = FixedThreshold(threshold(0.3));
        let event = CommandEvent::new("push", 0.4, 0.0);
        assert_eq!(translator.translate(&event, &source), Some(DeviceCommand::reset()));
        let event = CommandEvent::new("lift", 0.9, 0.0);
        assert_eq!(translator.translate(&event, &source), None);
    }

    struct CountingSource {
        reads: Cell<u32>,
        value: PowerThreshold,
    }

    impl ThresholdSource for CountingSource {
        fn current(&self) -> PowerThreshold {
            self.reads.set(self.reads.get() + 1);
            self.value
        }
    }

    #[test]
    fn test_threshold_read_on_every_event() {
        let translator = CommandTranslator::default();
        let source = CountingSource {
            reads: Cell::new(0),
            value: PowerThreshold::DEFAULT,
        };
        for power in [0.1_f64, 0.9, 0.2] {
            let _ = translator.translate(&CommandEvent::new("lift", power, 0.0), &source);
        }
        assert_eq!(source.reads.get(), 3);
    }
}
