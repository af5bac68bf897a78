//! Actuator worker.
//!
//! A confirmed send blocks until the controller echoes, which can take whole
//! seconds when it has to retry. The worker owns the [`DeviceLink`] on its own
//! thread and is fed through a bounded queue, so the event path only ever
//! enqueues.

use std::thread::{self, JoinHandle};

use thiserror::Error;
use tokio::sync::mpsc;

use neurograsp_core::protocol::DeviceCommand;

use super::serial::{DeviceLink, EchoChannel, LinkError};

/// Errors when handing a command to the actuator.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Queue is full; the command was dropped
    #[error("Actuator queue full, dropped {0:?}")]
    QueueFull(char),

    /// Worker has stopped
    #[error("Actuator worker stopped")]
    Stopped,

    /// Inline send failed
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Destination for device commands emitted by the translator.
pub trait CommandSink {
    /// Hand over a command.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the command could not be accepted.
    fn dispatch(&mut self, command: DeviceCommand) -> Result<(), DispatchError>;
}

/// Sends inline on the caller's thread, blocking until confirmed.
impl<C: EchoChannel> CommandSink for DeviceLink<C> {
    fn dispatch(&mut self, command: DeviceCommand) -> Result<(), DispatchError> {
        self.confirm(&command)?;
        Ok(())
    }
}

/// Counters reported when the worker stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Commands confirmed by the controller
    pub confirmed: u64,
    /// Commands that exhausted the retry policy or hit an I/O error
    pub failed: u64,
}

/// Queue-fed owner of the actuator link.
pub struct ActuatorWorker {
    tx: Option<mpsc::Sender<DeviceCommand>>,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl ActuatorWorker {
    /// Default queue depth.
    pub const DEFAULT_CAPACITY: usize = 8;

    /// Move `link` onto a dedicated thread fed by a queue of `capacity`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the thread cannot be spawned.
    pub fn spawn<C: EchoChannel + 'static>(
        link: DeviceLink<C>,
        capacity: usize,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<DeviceCommand>(capacity.max(1));

        let handle = thread::Builder::new()
            .name("actuator".to_string())
            .spawn(move || Self::run(link, rx))?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    fn run<C: EchoChannel>(mut link: DeviceLink<C>, mut rx: mpsc::Receiver<DeviceCommand>) -> WorkerStats {
        let mut stats = WorkerStats::default();

        while let Some(command) = rx.blocking_recv() {
            match link.confirm(&command) {
                Ok(confirmation) => {
                    stats.confirmed += 1;
                    tracing::debug!(
                        "Actuator confirmed {:?} after {} attempts",
                        char::from(command.code),
                        confirmation.attempts
                    );
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!("Actuator command failed: {}", e);
                    if matches!(e, LinkError::NotConnected(_) | LinkError::Io(_)) {
                        break;
                    }
                }
            }
        }

        link.close();
        stats
    }

    /// Stop accepting commands, drain the queue and join the thread.
    pub fn shutdown(mut self) -> WorkerStats {
        self.stop()
    }

    fn stop(&mut self) -> WorkerStats {
        self.tx.take();
        self.handle
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }
}

impl CommandSink for ActuatorWorker {
    fn dispatch(&mut self, command: DeviceCommand) -> Result<(), DispatchError> {
        let tx = self.tx.as_ref().ok_or(DispatchError::Stopped)?;
        let code = char::from(command.code);
        tx.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull(code),
            mpsc::error::TrySendError::Closed(_) => DispatchError::Stopped,
        })
    }
}

impl Drop for ActuatorWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
