//! Bridges to the actuator hardware
//!
//! - [`serial`]: Confirmed-send serial link to the arm controller
//! - [`worker`]: Queue-fed worker thread that owns the link
//!
//! ```rust,ignore
//! use neurograsp_native::bridge::{ActuatorWorker, CommandSink, DeviceLink};
//! use neurograsp_core::DeviceCommand;
//!
//! let mut link = DeviceLink::open("/dev/ttyACM0", 9600)?;
//! link.confirm(&DeviceCommand::reset())?;
//!
//! let mut worker = ActuatorWorker::spawn(link, 8)?;
//! worker.dispatch(DeviceCommand::grab())?;
//! ```

pub mod serial;
pub mod worker;

// Re-export key types
pub use serial::{
    Confirmation, DeviceLink, EchoChannel, LinkError, LinkResult, LinkState, RetryPolicy,
};
pub use worker::{ActuatorWorker, CommandSink, DispatchError, WorkerStats};

#[cfg(feature = "usb")]
pub use serial::SerialChannel;
