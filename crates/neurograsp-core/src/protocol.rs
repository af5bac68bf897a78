//! Wire protocol for the actuator controller
//!
//! The arm controller speaks line-delimited ASCII over a serial link:
//! - The host writes a single character command code (no terminator)
//! - The controller applies it and answers with the same character on a line
//!
//! The echo is the only acknowledgement the firmware can give, so every
//! command is sent until its echo comes back.

use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Serial baud rate of the actuator controller.
pub const BAUD_RATE: u32 = 9600;

/// Per-attempt read timeout in milliseconds.
pub const READ_TIMEOUT_MS: u64 = 1000;

/// Fixed delay between confirmation attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

// ============================================================================
// Command Codes
// ============================================================================

/// Command codes understood by the arm firmware.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActuatorCode {
    /// Close the gripper (trigger action)
    Grab = b'1',
    /// Return to the neutral pose; also used as the link handshake
    Reset = b'5',
}

impl ActuatorCode {
    /// Raw byte written to the wire.
    #[inline]
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

// ============================================================================
// Device Command
// ============================================================================

/// A single command routed to the actuator, together with the echo that
/// confirms it was applied.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceCommand {
    /// Byte written to the serial link
    pub code: u8,
    /// Trimmed line the controller must answer with
    pub expected_echo: String,
}

impl DeviceCommand {
    /// Create a command whose expected echo is the code itself.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidCode`] unless `code` is printable ASCII.
    pub fn echoed(code: u8) -> Result<Self, ProtocolError> {
        if !code.is_ascii_graphic() {
            return Err(ProtocolError::InvalidCode { code });
        }
        let mut expected_echo = String::with_capacity(1);
        expected_echo.push(char::from(code));
        Ok(Self { code, expected_echo })
    }

    /// Reset/handshake command (`5` → `5`).
    #[must_use]
    pub fn reset() -> Self {
        Self::from(ActuatorCode::Reset)
    }

    /// Grab command (`1` → `1`).
    #[must_use]
    pub fn grab() -> Self {
        Self::from(ActuatorCode::Grab)
    }

    /// Bytes to write for one attempt.
    #[inline]
    #[must_use]
    pub const fn encode(&self) -> [u8; 1] {
        [self.code]
    }

    /// Check a raw response line against the expected echo.
    #[must_use]
    pub fn is_confirmed_by(&self, line: &[u8]) -> bool {
        decode_echo(line) == self.expected_echo
    }
}

impl From<ActuatorCode> for DeviceCommand {
    fn from(code: ActuatorCode) -> Self {
        let mut expected_echo = String::with_capacity(1);
        expected_echo.push(char::from(code.as_byte()));
        Self {
            code: code.as_byte(),
            expected_echo,
        }
    }
}

/// Decode a response line permissively.
///
/// Invalid byte sequences are replaced rather than rejected, and surrounding
/// whitespace (including the line terminator) is trimmed.
#[must_use]
pub fn decode_echo(line: &[u8]) -> String {
    String::from(String::from_utf8_lossy(line).trim())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_bytes() {
        assert_eq!(ActuatorCode::Reset.as_byte(), b'5');
        assert_eq!(ActuatorCode::Grab.as_byte(), b'1');
    }

    #[test]
    fn test_reset_command() {
        let cmd = DeviceCommand::reset();
        assert_eq!(cmd.encode(), [b'5']);
        assert_eq!(cmd.expected_echo, "5");
    }

    #[test]
    fn test_echoed_rejects_control_bytes() {
        assert_eq!(
            DeviceCommand::echoed(b'\n'),
            Err(ProtocolError::InvalidCode { code: b'\n' })
        );
        assert_eq!(DeviceCommand::echoed(b'1'), Ok(DeviceCommand::grab()));
    }

    #[test]
    fn test_decode_trims_line_endings() {
        assert_eq!(decode_echo(b"5\r\n"), "5");
        assert_eq!(decode_echo(b"  5 "), "5");
    }

    #[test]
    fn test_decode_is_lossy() {
        let decoded = decode_echo(&[0xFF, b'5']);
        assert!(decoded.ends_with('5'));
        assert_ne!(decoded, "5");
    }

    #[test]
    fn test_confirmation_requires_exact_echo() {
        let cmd = DeviceCommand::reset();
        assert!(cmd.is_confirmed_by(b"5\n"));
        assert!(!cmd.is_confirmed_by(b"3\n"));
        assert!(!cmd.is_confirmed_by(b""));
        assert!(!cmd.is_confirmed_by(b"55\n"));
    }
}
