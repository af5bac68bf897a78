//! Serial link to the actuator controller
//!
//! Sends single-character commands and blocks until the controller echoes
//! the same character back. A command is only considered applied once its
//! echo has been read.
//!
//! ```text
//! Disconnected ──open──▶ Connected ──write──▶ AwaitingEcho ──echo ok──▶ Confirmed
//!                                                  │
//!                                       mismatch / timeout
//!                                                  ▼
//!                                      Retrying ──backoff──▶ (write again)
//!                                                  │
//!                                         attempts exhausted
//!                                                  ▼
//!                                              TimedOut
//! ```

use std::io;
#[cfg(feature = "usb")]
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use thiserror::Error;

use neurograsp_core::protocol::{decode_echo, DeviceCommand, READ_TIMEOUT_MS, RETRY_DELAY_MS};

// ============================================================================
// Error Types
// ============================================================================

/// Errors from the actuator link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The port could not be opened
    #[error("Connection failed on {address}: {reason}")]
    Connection {
        /// Port that failed to open
        address: String,
        /// Underlying cause
        reason: String,
    },

    /// The link was already closed
    #[error("Link to {0} is not connected")]
    NotConnected(String),

    /// No confirming echo within the retry policy
    #[error("No confirming echo for {code:?} after {attempts} attempts")]
    Timeout {
        /// Command character that went unconfirmed
        code: char,
        /// Number of writes performed
        attempts: u32,
    },

    /// Read or write failure on an open port
    #[error("Serial I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

// ============================================================================
// Byte Channel
// ============================================================================

/// Byte-oriented, line-delimited channel to the controller.
pub trait EchoChannel: Send {
    /// Write the encoded command bytes.
    fn write_code(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read one line, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. A partial line that
    /// was cut off by the timeout is returned as-is.
    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>>;
}

/// Serial port channel backed by the `serialport` crate.
#[cfg(feature = "usb")]
pub struct SerialChannel {
    port: Box<dyn serialport::SerialPort>,
}

#[cfg(feature = "usb")]
impl SerialChannel {
    /// Open a serial port.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Connection`] if the port cannot be opened.
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> LinkResult<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| LinkError::Connection {
                address: port_name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { port })
    }

    /// List available serial ports
    #[must_use]
    pub fn list_ports() -> Vec<String> {
        serialport::available_ports()
            .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
            .unwrap_or_default()
    }
}

#[cfg(feature = "usb")]
impl EchoChannel for SerialChannel {
    fn write_code(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>> {
        self.port.set_timeout(timeout)?;

        let deadline = Instant::now() + timeout;
        let mut line = Vec::with_capacity(8);
        let mut byte = [0u8; 1];

        while Instant::now() < deadline {
            match self.port.read(&mut byte) {
                Ok(0) => {}
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        return Ok(Some(line));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }

        Ok(if line.is_empty() { None } else { Some(line) })
    }
}

// ============================================================================
// Retry Policy
// ============================================================================

/// Limits on the confirm loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of writes; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Overall time budget across attempts
    pub deadline: Option<Duration>,
    /// Fixed pause between attempts
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Attempts allowed by default.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

    /// Retry until confirmed, with no cap. The caller must be able to
    /// tolerate a link that never answers.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_attempts: None,
            deadline: None,
            backoff: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    /// Retry at most `max_attempts` writes.
    #[must_use]
    pub const fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            deadline: None,
            backoff: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    /// Set the overall deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the pause between attempts.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self.deadline.is_some_and(|deadline| elapsed >= deadline)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::attempts(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

// ============================================================================
// Device Link
// ============================================================================

/// Where the link is in the confirm protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// No channel held
    Disconnected,
    /// Channel open, idle
    Connected,
    /// Command written, waiting for the echo line
    AwaitingEcho,
    /// Last command was echoed back
    Confirmed,
    /// Last attempt failed, backing off before the next
    Retrying {
        /// Attempts made so far
        attempt: u32,
    },
    /// Retry policy exhausted without a confirming echo
    TimedOut,
}

/// Successful confirmed send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    /// Writes performed, including the confirmed one
    pub attempts: u32,
    /// Decoded echo line
    pub echo: String,
}

type Sleeper = Box<dyn FnMut(Duration) + Send>;

/// Confirmed-send link to the actuator controller.
///
/// Dropping the link releases the channel, so every exit path frees the port.
pub struct DeviceLink<C: EchoChannel> {
    address: String,
    channel: Option<C>,
    state: LinkState,
    read_timeout: Duration,
    policy: RetryPolicy,
    sleep: Sleeper,
}

#[cfg(feature = "usb")]
impl DeviceLink<SerialChannel> {
    /// Open a serial link to the controller.
    ///
    /// # Arguments
    ///
    /// * `address` - Serial port name (e.g., "/dev/ttyACM0" or "COM3")
    /// * `baud_rate` - Baud rate (the arm firmware uses 9600)
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Connection`] if the port is unavailable.
    pub fn open(address: &str, baud_rate: u32) -> LinkResult<Self> {
        let read_timeout = Duration::from_millis(READ_TIMEOUT_MS);
        let channel = SerialChannel::open(address, baud_rate, read_timeout)?;
        tracing::info!("Opened actuator link on {} at {} baud", address, baud_rate);
        Ok(Self::with_channel(address, channel))
    }
}

impl<C: EchoChannel> DeviceLink<C> {
    /// Wrap an already-open channel.
    pub fn with_channel(address: impl Into<String>, channel: C) -> Self {
        Self {
            address: address.into(),
            channel: Some(channel),
            state: LinkState::Connected,
            read_timeout: Duration::from_millis(READ_TIMEOUT_MS),
            policy: RetryPolicy::default(),
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Set the per-attempt read timeout used by [`Self::confirm`].
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the retry policy used by [`Self::confirm`].
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace how the backoff pause is taken.
    #[must_use]
    pub fn with_sleeper(mut self, sleep: impl FnMut(Duration) + Send + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// Port name this link was opened on.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current protocol state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Check if the channel is still held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Send with the link's own timeout and retry policy.
    ///
    /// # Errors
    ///
    /// See [`Self::send_confirmed`].
    pub fn confirm(&mut self, command: &DeviceCommand) -> LinkResult<Confirmation> {
        let timeout = self.read_timeout;
        let policy = self.policy.clone();
        self.send_confirmed(command, timeout, &policy)
    }

    /// Write `command` and retry until the controller echoes it back.
    ///
    /// Each attempt writes the code, then reads one line for up to
    /// `per_attempt_timeout`. The trimmed, lossily decoded line must equal
    /// the command's expected echo. Anything else (or no line at all) sleeps
    /// for the policy's backoff and writes again.
    ///
    /// # Errors
    ///
    /// - [`LinkError::NotConnected`] after [`Self::close`]
    /// - [`LinkError::Timeout`] when the policy is exhausted
    /// - [`LinkError::Io`] on a port failure
    pub fn send_confirmed(
        &mut self,
        command: &DeviceCommand,
        per_attempt_timeout: Duration,
        policy: &RetryPolicy,
    ) -> LinkResult<Confirmation> {
        let started = Instant::now();
        let code = char::from(command.code);
        let mut attempts = 0u32;

        loop {
            let channel = self
                .channel
                .as_mut()
                .ok_or_else(|| LinkError::NotConnected(self.address.clone()))?;

            attempts += 1;
            channel.write_code(&command.encode())?;
            self.state = LinkState::AwaitingEcho;
            tracing::debug!("Sent {:?} to {} (attempt {})", code, self.address, attempts);

            match channel.read_line(per_attempt_timeout)? {
                Some(line) if command.is_confirmed_by(&line) => {
                    self.state = LinkState::Confirmed;
                    tracing::info!("Command {:?} confirmed by controller", code);
                    return Ok(Confirmation {
                        attempts,
                        echo: decode_echo(&line),
                    });
                }
                Some(line) => {
                    tracing::debug!(
                        "Unexpected echo {:?}, expected {:?}",
                        decode_echo(&line),
                        command.expected_echo
                    );
                }
                None => {
                    tracing::debug!("No echo within {:?}", per_attempt_timeout);
                }
            }

            if policy.exhausted(attempts, started.elapsed()) {
                self.state = LinkState::TimedOut;
                tracing::warn!("Command {:?} unconfirmed after {} attempts", code, attempts);
                return Err(LinkError::Timeout { code, attempts });
            }

            self.state = LinkState::Retrying { attempt: attempts };
            (self.sleep)(policy.backoff);
        }
    }

    /// Release the channel. Safe to call more than once.
    pub fn close(&mut self) {
        if self.channel.take().is_some() {
            tracing::info!("Closed actuator link on {}", self.address);
        }
        self.state = LinkState::Disconnected;
    }
}

impl<C: EchoChannel> Drop for DeviceLink<C> {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted channel: each read pops the next queued reply.
    #[derive(Clone, Default)]
    pub(crate) struct ScriptedChannel {
        pub writes: Arc<Mutex<Vec<Vec<u8>>>>,
        pub replies: Arc<Mutex<VecDeque<Option<Vec<u8>>>>>,
        pub dropped: Arc<Mutex<bool>>,
    }

    impl ScriptedChannel {
        pub(crate) fn with_replies(replies: &[Option<&str>]) -> Self {
            let channel = Self::default();
            channel
                .replies
                .lock()
                .unwrap()
                .extend(replies.iter().map(|r| r.map(|s| s.as_bytes().to_vec())));
            channel
        }

        pub(crate) fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    impl EchoChannel for ScriptedChannel {
        fn write_code(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.writes.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }

        fn read_line(&mut self, _timeout: Duration) -> io::Result<Option<Vec<u8>>> {
            Ok(self.replies.lock().unwrap().pop_front().flatten())
        }
    }

    impl Drop for ScriptedChannel {
        fn drop(&mut self) {
            *self.dropped.lock().unwrap() = true;
        }
    }

    fn recording_link(channel: ScriptedChannel) -> (DeviceLink<ScriptedChannel>, Arc<Mutex<Vec<Duration>>>) {
        let sleeps = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&sleeps);
        let link = DeviceLink::with_channel("/dev/ttyTEST0", channel)
            .with_sleeper(move |d| recorded.lock().unwrap().push(d));
        (link, sleeps)
    }

    #[test]
    fn test_confirmed_on_first_echo() {
        let channel = ScriptedChannel::with_replies(&[Some("5\r\n")]);
        let (mut link, sleeps) = recording_link(channel.clone());

        let confirmation = link.confirm(&DeviceCommand::reset()).unwrap();

        assert_eq!(confirmation.attempts, 1);
        assert_eq!(confirmation.echo, "5");
        assert_eq!(link.state(), LinkState::Confirmed);
        assert!(sleeps.lock().unwrap().is_empty());
        assert_eq!(channel.writes.lock().unwrap()[0], vec![b'5']);
    }

    #[test]
    fn test_wrong_echo_retries_after_backoff() {
        let channel = ScriptedChannel::with_replies(&[Some("3\n"), Some("5\n")]);
        let (mut link, sleeps) = recording_link(channel.clone());

        let confirmation = link
            .send_confirmed(&DeviceCommand::reset(), Duration::from_secs(1), &RetryPolicy::unbounded())
            .unwrap();

        assert_eq!(confirmation.attempts, 2);
        assert_eq!(channel.write_count(), 2);
        assert_eq!(*sleeps.lock().unwrap(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn test_timeout_counts_as_failed_attempt() {
        let channel = ScriptedChannel::with_replies(&[None, None, Some("1\n")]);
        let (mut link, sleeps) = recording_link(channel.clone());

        let confirmation = link.confirm(&DeviceCommand::grab()).unwrap();

        assert_eq!(confirmation.attempts, 3);
        assert_eq!(sleeps.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_bytes_do_not_abort() {
        let channel = ScriptedChannel::default();
        channel.replies.lock().unwrap().push_back(Some(vec![0xC3, 0x28, b'\n']));
        channel.replies.lock().unwrap().push_back(Some(b"5\n".to_vec()));
        let (mut link, _) = recording_link(channel.clone());

        let confirmation = link.confirm(&DeviceCommand::reset()).unwrap();
        assert_eq!(confirmation.attempts, 2);
    }

    #[test]
    fn test_attempt_ceiling_returns_timeout() {
        let channel = ScriptedChannel::with_replies(&[Some("3\n"), Some("3\n"), Some("3\n")]);
        let (link, sleeps) = recording_link(channel.clone());
        let mut link = link.with_policy(RetryPolicy::attempts(3).with_backoff(Duration::from_millis(10)));

        let err = link.confirm(&DeviceCommand::reset()).unwrap_err();

        assert!(matches!(err, LinkError::Timeout { code: '5', attempts: 3 }));
        assert_eq!(link.state(), LinkState::TimedOut);
        assert_eq!(channel.write_count(), 3);
        // No pause after the final attempt
        assert_eq!(sleeps.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_deadline_returns_timeout() {
        let channel = ScriptedChannel::with_replies(&[None, None]);
        let (mut link, _) = recording_link(channel);

        let policy = RetryPolicy::unbounded().with_deadline(Duration::ZERO);
        let err = link
            .send_confirmed(&DeviceCommand::reset(), Duration::from_millis(1), &policy)
            .unwrap_err();

        assert!(matches!(err, LinkError::Timeout { attempts: 1, .. }));
    }

    #[test]
    fn test_send_after_close_fails() {
        let channel = ScriptedChannel::with_replies(&[Some("5\n")]);
        let (mut link, _) = recording_link(channel.clone());

        link.close();
        link.close();

        assert!(!link.is_open());
        assert_eq!(link.state(), LinkState::Disconnected);
        assert!(*channel.dropped.lock().unwrap());
        assert!(matches!(
            link.confirm(&DeviceCommand::reset()),
            Err(LinkError::NotConnected(_))
        ));
        assert_eq!(channel.write_count(), 0);
    }

    #[test]
    fn test_drop_releases_channel_after_failure() {
        let channel = ScriptedChannel::with_replies(&[None]);
        let dropped = Arc::clone(&channel.dropped);
        {
            let (link, _) = recording_link(channel);
            let mut link = link.with_policy(RetryPolicy::attempts(1));
            assert!(link.confirm(&DeviceCommand::reset()).is_err());
        }
        assert!(*dropped.lock().unwrap());
    }

    #[cfg(feature = "usb")]
    #[test]
    fn test_list_ports_returns_plain_names() {
        for name in SerialChannel::list_ports() {
            assert!(!name.is_empty());
        }
    }
}
