//! Session and profile state machine
//!
//! Sequences everything between "open a session" and "stream commands":
//!
//! ```text
//! Idle ─start─▶ SessionOpen ─▶ ProfileResolving ─▶ ProfileLoading
//!                                                       │
//!   Subscribed ◀─ ProfileSaving ◀─ SensitivityWriting ◀─ SensitivityReading
//!       │
//!       └──▶ Disconnected | Errored
//! ```
//!
//! - [`controller`]: The state machine, fed one [`crate::cortex::CortexEvent`] at a time
//! - [`profile`]: Profile discovery, load/create and save requests
//! - [`sensitivity`]: Sensitivity slot counting, validation and writes

use std::fmt;

use thiserror::Error;

use crate::cortex::ClientError;

pub mod controller;
pub mod profile;
pub mod sensitivity;

pub use controller::SessionController;
pub use profile::{ProfileManager, ProfileResolution};
pub use sensitivity::SensitivityConfigurator;

/// Where the session is in its setup sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing requested yet, or a profile was unloaded
    Idle,
    /// Waiting for the session to open
    SessionOpen,
    /// Waiting for the profile list
    ProfileResolving,
    /// Waiting for a load or unload to finish
    ProfileLoading,
    /// Waiting for active actions or the current sensitivity
    SensitivityReading,
    /// Waiting for the sensitivity write
    SensitivityWriting,
    /// Waiting for the profile save
    ProfileSaving,
    /// Streaming command data
    Subscribed,
    /// The source closed the session
    Disconnected,
    /// The source reported an error
    Errored,
}

impl SessionState {
    /// Check if the session can make no further progress.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Errored)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors from driving the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Caller passed an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not allowed in the current state
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// Rejected operation
        operation: &'static str,
        /// State at the time
        state: SessionState,
    },

    /// A request could not be delivered
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Counters over the life of one controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Command-data events received while subscribed
    pub events: u64,
    /// Events that produced a device command
    pub triggers: u64,
    /// Events below threshold or for another action
    pub suppressed: u64,
    /// Device commands the sink refused
    pub dispatch_failures: u64,
}
