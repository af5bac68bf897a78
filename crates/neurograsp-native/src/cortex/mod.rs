//! Boundary to the mental-command streaming source
//!
//! The source's own transport (authorization, websocket, reconnection) lives
//! outside this crate. What the session controller sees is:
//!
//! - [`client`]: the request sink ([`StreamingClient`]) and a JSON-lines
//!   implementation
//! - [`event`]: the completion callbacks as a typed [`CortexEvent`]
//!
//! ```rust,ignore
//! use neurograsp_native::cortex::{parse_event, JsonLineClient};
//!
//! let mut client = JsonLineClient::new(std::io::stdout());
//! for line in std::io::stdin().lines() {
//!     let event = parse_event(&line?)?;
//!     controller.handle(event)?;
//! }
//! ```

use thiserror::Error;

pub mod client;
pub mod event;

pub use client::{JsonLineClient, Request, StreamingClient};
pub use event::{
    parse_event, CortexEvent, ErrorKind, ErrorReport, SensitivityResult, ERR_PROFILE_ACCESS_DENIED,
};

/// Errors at the streaming-source boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Writing a request failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload had the right type but unusable content
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// Result type for boundary operations.
pub type ClientResult<T> = Result<T, ClientError>;
