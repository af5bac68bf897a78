//! neurograsp Native - Host side of the BCI actuator bridge
//!
//! This crate runs the parts of the bridge that need an operating system:
//! - Session and profile sequencing against the mental-command source
//! - Confirmed serial sends to the arm controller
//! - The file-backed power threshold shared with the tuning tool
//! - Layered configuration
//!
//! # Modules
//!
//! - [`bridge`]: Serial link and actuator worker
//! - [`cortex`]: Streaming-source requests and events
//! - [`session`]: Session controller, profile manager, sensitivity configurator
//! - [`threshold`]: File-backed threshold source
//! - [`config`]: TOML, environment and CLI configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod bridge;
pub mod config;
pub mod cortex;
pub mod session;
pub mod threshold;

// Re-export key types
pub use bridge::{ActuatorWorker, CommandSink, DeviceLink, LinkError, RetryPolicy};
pub use config::{load_config, BridgeConfig, ConfigError};
pub use cortex::{parse_event, ClientError, CortexEvent, JsonLineClient, StreamingClient};
pub use session::{SessionController, SessionError, SessionState, SessionStats};
pub use threshold::FileThreshold;
