//! Request side of the streaming client.
//!
//! The session controller talks to the streaming source only through the
//! [`StreamingClient`] trait. Each method is fire-and-forget: the matching
//! completion arrives later as a [`super::CortexEvent`].

use std::io::Write;

use serde::{Deserialize, Serialize};

use neurograsp_core::types::{DataStream, ProfileOp};

use super::ClientResult;

/// Outbound request, one per line on the JSON-lines wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request")]
pub enum Request {
    /// Open a session for the wanted profile and optional headset
    #[serde(rename = "create_session")]
    OpenSession {
        /// Wanted profile name
        profile: String,
        /// Wanted headset id; the source picks the first one when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headset: Option<String>,
    },

    /// List every profile known to the source
    #[serde(rename = "query_profile")]
    QueryProfiles,

    /// Ask which profile is loaded; the source loads the wanted one if needed
    #[serde(rename = "get_current_profile")]
    GetCurrentProfile,

    /// Load, unload, save or create a profile
    #[serde(rename = "setup_profile")]
    SetupProfile {
        /// Profile name
        profile: String,
        /// Operation
        status: ProfileOp,
    },

    /// List the active mental-command actions of a profile
    #[serde(rename = "get_mc_active_action")]
    GetActiveActions {
        /// Profile name
        profile: String,
    },

    /// Read the action-sensitivity vector
    #[serde(rename = "get_mc_action_sensitivity")]
    GetSensitivity {
        /// Profile name
        profile: String,
    },

    /// Write the action-sensitivity vector
    #[serde(rename = "set_mc_action_sensitivity")]
    SetSensitivity {
        /// Profile name
        profile: String,
        /// One value per active non-neutral action
        values: Vec<u8>,
    },

    /// Subscribe to data streams
    #[serde(rename = "subscribe")]
    Subscribe {
        /// Streams to subscribe to
        streams: Vec<DataStream>,
    },

    /// Disconnect the headset so the next run can reacquire it
    #[serde(rename = "disconnect_headset")]
    DisconnectDevice,
}

/// Request sink of the streaming source.
pub trait StreamingClient {
    /// Send a single request.
    ///
    /// # Errors
    ///
    /// Returns a [`super::ClientError`] if the request could not be delivered.
    fn send(&mut self, request: Request) -> ClientResult<()>;

    /// Open a session.
    fn open_session(&mut self, profile: &str, headset: Option<&str>) -> ClientResult<()> {
        self.send(Request::OpenSession {
            profile: profile.to_string(),
            headset: headset.map(str::to_string),
        })
    }

    /// Query all profiles.
    fn query_profiles(&mut self) -> ClientResult<()> {
        self.send(Request::QueryProfiles)
    }

    /// Get (and load) the current profile.
    fn get_current_profile(&mut self) -> ClientResult<()> {
        self.send(Request::GetCurrentProfile)
    }

    /// Run a profile operation.
    fn setup_profile(&mut self, profile: &str, op: ProfileOp) -> ClientResult<()> {
        self.send(Request::SetupProfile {
            profile: profile.to_string(),
            status: op,
        })
    }

    /// Query active actions.
    fn get_active_actions(&mut self, profile: &str) -> ClientResult<()> {
        self.send(Request::GetActiveActions {
            profile: profile.to_string(),
        })
    }

    /// Read sensitivity.
    fn get_sensitivity(&mut self, profile: &str) -> ClientResult<()> {
        self.send(Request::GetSensitivity {
            profile: profile.to_string(),
        })
    }

    /// Write sensitivity.
    fn set_sensitivity(&mut self, profile: &str, values: &[u8]) -> ClientResult<()> {
        self.send(Request::SetSensitivity {
            profile: profile.to_string(),
            values: values.to_vec(),
        })
    }

    /// Subscribe to streams.
    fn subscribe(&mut self, streams: &[DataStream]) -> ClientResult<()> {
        self.send(Request::Subscribe {
            streams: streams.to_vec(),
        })
    }

    /// Disconnect the current headset.
    fn disconnect_device(&mut self) -> ClientResult<()> {
        self.send(Request::DisconnectDevice)
    }
}

// ============================================================================
// JSON-lines Client
// ============================================================================

/// Writes each request as one JSON object per line.
///
/// Pairs with [`super::parse_event`] on the inbound side to drive the
/// controller from any process that speaks to the real source.
pub struct JsonLineClient<W: Write> {
    writer: W,
    sent: u64,
}

impl<W: Write> JsonLineClient<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer, sent: 0 }
    }

    /// Number of requests written.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> StreamingClient for JsonLineClient<W> {
    fn send(&mut self, request: Request) -> ClientResult<()> {
        serde_json::to_writer(&mut self.writer, &request)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.sent += 1;
        tracing::trace!("-> {:?}", request);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn written_lines(client: JsonLineClient<Vec<u8>>) -> Vec<String> {
        String::from_utf8(client.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_setup_profile_wire_form() {
        let mut client = JsonLineClient::new(Vec::new());
        client.setup_profile("NewProfile", ProfileOp::Create).unwrap();
        assert_eq!(client.sent(), 1);
        assert_eq!(
            written_lines(client),
            vec![r#"{"request":"setup_profile","profile":"NewProfile","status":"create"}"#]
        );
    }

    #[test]
    fn test_session_without_headset_omits_field() {
        let mut client = JsonLineClient::new(Vec::new());
        client.open_session("Arm-1", None).unwrap();
        client.open_session("Arm-1", Some("EPOCX-1234")).unwrap();
        assert_eq!(
            written_lines(client),
            vec![
                r#"{"request":"create_session","profile":"Arm-1"}"#,
                r#"{"request":"create_session","profile":"Arm-1","headset":"EPOCX-1234"}"#,
            ]
        );
    }

    #[test]
    fn test_sensitivity_and_subscribe_wire_form() {
        let mut client = JsonLineClient::new(Vec::new());
        client.set_sensitivity("Arm-1", &[5, 5]).unwrap();
        client.subscribe(&[DataStream::MentalCommand]).unwrap();
        client.disconnect_device().unwrap();
        assert_eq!(
            written_lines(client),
            vec![
                r#"{"request":"set_mc_action_sensitivity","profile":"Arm-1","values":[5,5]}"#,
                r#"{"request":"subscribe","streams":["com"]}"#,
                r#"{"request":"disconnect_headset"}"#,
            ]
        );
    }

    #[test]
    fn test_request_lines_parse_back() {
        let line = r#"{"request":"get_mc_active_action","profile":"Arm-1"}"#;
        let request: Request = serde_json::from_str(line).unwrap();
        assert_eq!(
            request,
            Request::GetActiveActions {
                profile: "Arm-1".to_string()
            }
        );
    }
}
