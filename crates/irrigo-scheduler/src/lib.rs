//! `irrigo-scheduler`: weekly watering triggers.
//!
//! # Overview
//!
//! [`compile`] turns the stored schedule plus the cancellation override into
//! a flat set of weekly [`Trigger`]s, two per entry (ON at the start time,
//! OFF at start + duration, wrapped within 24 h on the same weekday).
//! [`SchedulerHandle::recompile`] always rebuilds the whole set and swaps it
//! in atomically; there is no incremental diffing.
//!
//! [`SchedulerEngine`] polls the installed set on a fixed tick and fires
//! every trigger whose next occurrence fell inside the elapsed window,
//! using local wall-clock time.

pub mod compile;
pub mod engine;
pub mod schedule;
pub mod types;

pub use compile::compile;
pub use engine::{SchedulerEngine, SchedulerHandle};
pub use types::{Compilation, CompiledJob, Trigger};
