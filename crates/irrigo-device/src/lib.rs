//! `irrigo-device`: client for the networked relay controller.
//!
//! Every command opens its own TCP connection, sends one plaintext request
//! and reads at most one reply (see [`protocol`]). Failures are logged and
//! reported as [`CommandOutcome::Unreachable`]; nothing here panics or
//! propagates a transport error to the scheduler.

pub mod client;
pub mod error;
pub mod protocol;
pub mod status;

pub use client::{CommandOutcome, DeviceClient, ValveDriver};
pub use error::DeviceError;
pub use status::{StatusReading, StatusSynchronizer, ValveStatusSnapshot};
