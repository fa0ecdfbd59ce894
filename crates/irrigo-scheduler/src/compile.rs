//! Schedule entries → weekly ON/OFF triggers.

use chrono::NaiveDate;
use irrigo_core::{CancellationOverride, Command, ScheduleEntry};
use tracing::{debug, warn};

use crate::types::{Compilation, CompiledJob, Trigger};

/// Compile a schedule snapshot as of `today`.
///
/// Pure: same inputs, same output. Entries with an unknown weekday or an
/// out-of-range duration are skipped with a warning; entries on today's
/// weekday are dropped entirely while the override cancels `today`.
pub fn compile(
    entries: &[ScheduleEntry],
    cancellation: &CancellationOverride,
    today: NaiveDate,
) -> Compilation {
    let mut out = Compilation::default();

    for (index, entry) in entries.iter().enumerate() {
        let Some(day) = entry.weekday() else {
            warn!(index, day = %entry.day, "unknown day of week, entry skipped");
            out.skipped_unknown_day.push(index);
            continue;
        };

        if !entry.has_valid_duration() {
            warn!(index, duration = entry.duration_minutes, "duration out of range, entry skipped");
            out.skipped_invalid_duration.push(index);
            continue;
        }

        if cancellation.suppresses(day, today) {
            debug!(index, %today, "watering canceled for today, entry skipped");
            out.skipped_canceled.push(index);
            continue;
        }

        let (off_at, crosses_midnight) = entry.end();
        if crosses_midnight {
            warn!(
                index,
                start = %entry.start,
                duration = entry.duration_minutes,
                off = %off_at,
                "watering crosses midnight; OFF trigger stays on the same weekday"
            );
        }

        let trigger = |command, at| Trigger {
            day,
            at,
            command,
            valves: entry.valves.clone(),
            entry_index: index,
        };
        out.jobs.push(CompiledJob {
            on: trigger(Command::On, entry.start),
            off: trigger(Command::Off, off_at),
            crosses_midnight,
        });
    }

    out
}
