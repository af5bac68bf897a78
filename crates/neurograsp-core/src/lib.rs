//! neurograsp Core - `no_std` types and protocol for the BCI actuator bridge
//!
//! This crate provides the pieces of the bridge that need no operating
//! system: the mental-command event model, sensitivity validation, threshold
//! gating and the actuator wire protocol. It builds with `alloc` only, so the
//! same definitions can be shared with firmware-side tooling.
//!
//! # Modules
//!
//! - [`types`]: Command events, power threshold, profile operations, streams
//! - [`error`]: Error types for sensitivity, threshold and protocol handling
//! - [`sensitivity`]: Sensitivity vector validation and plans
//! - [`translator`]: Event classification and the threshold source trait
//! - [`protocol`]: Single-character command codes and echo decoding
//!
//! # Features
//!
//! - `std`: Implement `std::error::Error` for the error types
//!
//! # Example
//!
//! ```rust
//! use neurograsp_core::translator::{CommandTranslator, FixedThreshold};
//! use neurograsp_core::types::{CommandEvent, PowerThreshold};
//!
//! let translator = CommandTranslator::default();
//! let threshold = FixedThreshold(PowerThreshold::DEFAULT);
//!
//! let event = CommandEvent::new("lift", 0.85, 1647525819.0223);
//! let command = translator.translate(&event, &threshold).unwrap();
//! assert_eq!(command.encode(), [b'1']);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod protocol;
pub mod sensitivity;
pub mod translator;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ProtocolError, SensitivityError, ThresholdError};
pub use protocol::{ActuatorCode, DeviceCommand};
pub use sensitivity::{SensitivityPlan, SensitivityVector};
pub use translator::{Classification, CommandTranslator, FixedThreshold, ThresholdSource};
pub use types::{CommandEvent, DataStream, PowerThreshold, ProfileOp, ThresholdBand, ThresholdPreset};
