//! `irrigo-core`: domain types, valve registry and configuration shared by
//! every irrigo crate.

pub mod action;
pub mod cancel;
pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use action::ActionSink;
pub use cancel::{CancellationOverride, OverrideState};
pub use config::IrrigoConfig;
pub use error::{IrrigoError, Result};
pub use registry::{SharedRegistry, ValveInfo, ValveRegistry};
pub use types::{ActionLogEntry, ClockTime, Command, PhysicalId, ScheduleEntry, ValveId};
