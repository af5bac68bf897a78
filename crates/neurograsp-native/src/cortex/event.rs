//! Inbound completion events.
//!
//! The streaming source reports every finished request on a named callback.
//! The boundary adapter here turns one JSON line into a typed
//! [`CortexEvent`], resolving the sensitivity callback's payload shape into an
//! explicit [`SensitivityResult`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use neurograsp_core::types::CommandEvent;

use super::{ClientError, ClientResult};

/// Error code reported when another application holds the profile.
pub const ERR_PROFILE_ACCESS_DENIED: i32 = -32046;

/// Outcome carried by the sensitivity callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SensitivityResult {
    /// A read completed with the current vector
    Read(Vec<i32>),
    /// A write completed
    WriteAck,
}

/// Error reported by the streaming source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Source error code
    pub code: i32,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

/// Classification of source errors the controller reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The profile is held by another session
    ProfileAccessDenied,
    /// Anything else
    Other(i32),
}

impl ErrorReport {
    /// Classify the error code.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.code {
            ERR_PROFILE_ACCESS_DENIED => ErrorKind::ProfileAccessDenied,
            code => ErrorKind::Other(code),
        }
    }
}

/// A completion callback or data event from the streaming source.
#[derive(Clone, Debug, PartialEq)]
pub enum CortexEvent {
    /// Session is open
    SessionCreated,
    /// Profile list is available
    ProfileQueryDone {
        /// Profile names known to the source
        profiles: Vec<String>,
    },
    /// A load or unload finished
    LoadUnloadDone {
        /// Whether a profile is loaded now
        loaded: bool,
    },
    /// The profile was saved
    SaveDone,
    /// Active actions are available
    ActiveActionsDone {
        /// Active action labels, including neutral
        actions: Vec<String>,
    },
    /// A sensitivity read or write finished
    SensitivityDone(SensitivityResult),
    /// A mental-command detection
    CommandData(CommandEvent),
    /// The source reported an error
    InformError(ErrorReport),
    /// The session ended on the source side
    SessionClosed,
}

/// Wire shape, named after the source's own callbacks.
#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WireEvent {
    CreateSessionDone,
    QueryProfileDone {
        data: Vec<String>,
    },
    LoadUnloadProfileDone {
        #[serde(rename = "isLoaded")]
        is_loaded: bool,
    },
    SaveProfileDone,
    GetMcActiveActionDone {
        data: Vec<String>,
    },
    McActionSensitivityDone {
        #[serde(default)]
        data: Value,
    },
    NewComData {
        data: CommandEvent,
    },
    InformError {
        error_data: ErrorReport,
    },
    SessionClosed,
}

/// Parse one JSON event line.
///
/// # Errors
///
/// Returns [`ClientError::Json`] for unknown events or bad shapes, and
/// [`ClientError::Malformed`] for a sensitivity list with non-integer entries.
pub fn parse_event(line: &str) -> ClientResult<CortexEvent> {
    let event = match serde_json::from_str::<WireEvent>(line)? {
        WireEvent::CreateSessionDone => CortexEvent::SessionCreated,
        WireEvent::QueryProfileDone { data } => CortexEvent::ProfileQueryDone { profiles: data },
        WireEvent::LoadUnloadProfileDone { is_loaded } => CortexEvent::LoadUnloadDone { loaded: is_loaded },
        WireEvent::SaveProfileDone => CortexEvent::SaveDone,
        WireEvent::GetMcActiveActionDone { data } => CortexEvent::ActiveActionsDone { actions: data },
        WireEvent::McActionSensitivityDone { data } => CortexEvent::SensitivityDone(sensitivity_result(data)?),
        WireEvent::NewComData { data } => CortexEvent::CommandData(data),
        WireEvent::InformError { error_data } => CortexEvent::InformError(error_data),
        WireEvent::SessionClosed => CortexEvent::SessionClosed,
    };
    Ok(event)
}

/// A list payload is a completed read; anything else acknowledges a write.
fn sensitivity_result(data: Value) -> ClientResult<SensitivityResult> {
    let Value::Array(items) = data else {
        return Ok(SensitivityResult::WriteAck);
    };

    items
        .iter()
        .map(|item| {
            item.as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| ClientError::Malformed(format!("sensitivity entry {item}")))
        })
        .collect::<ClientResult<Vec<i32>>>()
        .map(SensitivityResult::Read)
}

// ============================================================================
// Tests
// ============================================================================
