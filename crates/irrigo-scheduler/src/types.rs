use chrono::Weekday;
use irrigo_core::{ClockTime, Command, ValveId};
use serde::Serialize;

/// A weekly point in time that switches a set of valves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trigger {
    pub day: Weekday,
    pub at: ClockTime,
    pub command: Command,
    pub valves: Vec<ValveId>,
    /// Index of the schedule entry this trigger was compiled from.
    pub entry_index: usize,
}

/// The ON/OFF pair compiled from one schedule entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledJob {
    pub on: Trigger,
    pub off: Trigger,
    /// Start + duration passes midnight. The OFF trigger still sits on the
    /// entry's weekday, so it fires six days after the intended shutoff.
    pub crosses_midnight: bool,
}

/// Result of one compile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Compilation {
    pub jobs: Vec<CompiledJob>,
    /// Entries skipped because their day of week is not recognised.
    pub skipped_unknown_day: Vec<usize>,
    /// Entries skipped because their duration is zero or a full day or more.
    pub skipped_invalid_duration: Vec<usize>,
    /// Entries skipped because today's watering is canceled.
    pub skipped_canceled: Vec<usize>,
}

impl Compilation {
    /// Flattened trigger set, ON before OFF for each entry.
    pub fn triggers(&self) -> Vec<Trigger> {
        self.jobs
            .iter()
            .flat_map(|job| [job.on.clone(), job.off.clone()])
            .collect()
    }
}
