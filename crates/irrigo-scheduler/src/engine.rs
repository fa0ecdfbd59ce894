use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime};
use irrigo_device::{CommandOutcome, ValveDriver};
use irrigo_store::ScheduleStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    compile::compile,
    schedule::is_due,
    types::{Compilation, Trigger},
};

/// Shared handle to the installed trigger set.
///
/// Cloned into the console handlers (which recompile) and the engine (which
/// reads). A recompile builds the new set first and swaps it in with one
/// write, so readers never observe an empty or half-built set.
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    triggers: Arc<RwLock<Arc<Vec<Trigger>>>>,
}

impl SchedulerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every installed trigger with `compilation`'s.
    pub fn install(&self, compilation: &Compilation) -> usize {
        let next = Arc::new(compilation.triggers());
        let count = next.len();
        *self.triggers.write().unwrap_or_else(|e| e.into_inner()) = next;
        count
    }

    /// Snapshot of the current trigger set.
    pub fn triggers(&self) -> Arc<Vec<Trigger>> {
        Arc::clone(&self.triggers.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Rebuild all triggers from the store as of today (local time).
    pub fn recompile(&self, store: &ScheduleStore) -> irrigo_store::Result<Compilation> {
        self.recompile_for(store, Local::now().date_naive())
    }

    pub fn recompile_for(
        &self,
        store: &ScheduleStore,
        today: NaiveDate,
    ) -> irrigo_store::Result<Compilation> {
        let entries = store.list()?;
        let cancellation = store.get_override()?;
        let compilation = compile(&entries, &cancellation, today);
        let count = self.install(&compilation);
        info!(
            entries = entries.len(),
            triggers = count,
            skipped_unknown_day = compilation.skipped_unknown_day.len(),
            skipped_invalid_duration = compilation.skipped_invalid_duration.len(),
            skipped_canceled = compilation.skipped_canceled.len(),
            "schedule recompiled"
        );
        Ok(compilation)
    }
}

/// Fires installed triggers against the relay controller.
pub struct SchedulerEngine {
    handle: SchedulerHandle,
    driver: Arc<dyn ValveDriver>,
    tick: Duration,
}

impl SchedulerEngine {
    pub fn new(handle: SchedulerHandle, driver: Arc<dyn ValveDriver>, tick: Duration) -> Self {
        Self {
            handle,
            driver,
            tick,
        }
    }

    /// Main event loop. Polls every `tick` until `shutdown` broadcasts `true`.
    ///
    /// Occurrences between engine start and the first tick are not replayed;
    /// a trigger whose time passed while the process was down is simply missed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(tick_ms = self.tick.as_millis() as u64, "scheduler engine started");
        let mut last = Local::now().naive_local();

        let mut interval = tokio::time::interval(self.tick);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Local::now().naive_local();
                    // Clock went backwards (DST fall-back, NTP step): hold
                    // `last` so the repeated hour does not fire twice.
                    if now > last {
                        self.fire_due(last, now);
                        last = now;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Spawn one task per trigger with an occurrence in `(last, now]`.
    ///
    /// Each firing gets its own connection, so coinciding triggers run
    /// concurrently. Failures are logged inside the task and never reach
    /// the loop.
    pub fn fire_due(&self, last: NaiveDateTime, now: NaiveDateTime) -> Vec<JoinHandle<CommandOutcome>> {
        let triggers = self.handle.triggers();
        triggers
            .iter()
            .filter(|t| is_due(t, last, now))
            .cloned()
            .map(|trigger| {
                let driver = Arc::clone(&self.driver);
                tokio::spawn(async move {
                    info!(
                        command = %trigger.command,
                        valves = ?trigger.valves,
                        entry = trigger.entry_index,
                        "trigger fired"
                    );
                    let outcome = driver.send_command(trigger.command, &trigger.valves).await;
                    match &outcome {
                        CommandOutcome::Acknowledged { .. } => {}
                        CommandOutcome::Rejected { reply } => {
                            warn!(command = %trigger.command, %reply, "scheduled command rejected")
                        }
                        CommandOutcome::Unreachable { reason } => {
                            error!(command = %trigger.command, %reason, "scheduled command not delivered")
                        }
                    }
                    outcome
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Datelike;
    use irrigo_core::{CancellationOverride, ClockTime, Command, ScheduleEntry, ValveId};
    use rusqlite::Connection;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(Command, Vec<ValveId>)>>);

    #[async_trait]
    impl ValveDriver for Recorder {
        async fn send_command(&self, command: Command, valves: &[ValveId]) -> CommandOutcome {
            self.0.lock().unwrap().push((command, valves.to_vec()));
            CommandOutcome::Acknowledged { reply: None }
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn store_with(entries: &[(&str, u8, u8, u32, Vec<ValveId>)]) -> ScheduleStore {
        let store = ScheduleStore::new(Connection::open_in_memory().unwrap()).unwrap();
        for (day, h, m, duration, valves) in entries {
            store
                .add(&ScheduleEntry {
                    day: day.to_string(),
                    start: ClockTime::new(*h, *m).unwrap(),
                    duration_minutes: *duration,
                    valves: valves.clone(),
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn recompile_twice_installs_identical_set() {
        let store = store_with(&[("Monday", 6, 0, 10, vec![1]), ("Friday", 18, 30, 5, vec![2])]);
        let handle = SchedulerHandle::new();
        handle.recompile_for(&store, monday()).unwrap();
        let first = handle.triggers();
        handle.recompile_for(&store, monday()).unwrap();
        assert_eq!(*first, *handle.triggers());
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn recompile_replaces_previous_set() {
        let store = store_with(&[("Monday", 6, 0, 10, vec![1])]);
        let handle = SchedulerHandle::new();
        handle.recompile_for(&store, monday()).unwrap();
        assert_eq!(handle.triggers().len(), 2);

        store.remove_at(0).unwrap();
        handle.recompile_for(&store, monday()).unwrap();
        assert!(handle.triggers().is_empty());
    }

    #[test]
    fn recompile_honours_stored_override() {
        let store = store_with(&[("Monday", 6, 0, 10, vec![1]), ("Tuesday", 6, 0, 10, vec![2])]);
        store
            .set_override(&CancellationOverride::canceled_for(monday()))
            .unwrap();
        let handle = SchedulerHandle::new();
        let c = handle.recompile_for(&store, monday()).unwrap();
        assert_eq!(c.skipped_canceled, vec![0]);
        assert!(handle.triggers().iter().all(|t| t.valves == vec![2]));
    }

    #[test]
    fn unreadable_row_does_not_block_the_rest() {
        let conn = Connection::open_in_memory().unwrap();
        irrigo_store::db::init_db(&conn).unwrap();
        conn.execute(
            "INSERT INTO schedule_entries (day, start, duration_minutes, valves)
             VALUES ('Monday', '06:00', 10, '[1]'), ('Friday', '6h', 10, '[1]'),
                    ('Tuesday', '07:00', 10, '[2]')",
            [],
        )
        .unwrap();
        let store = ScheduleStore::new(conn).unwrap();

        let handle = SchedulerHandle::new();
        handle.recompile_for(&store, monday()).unwrap();
        assert_eq!(handle.triggers().len(), 4);
    }

    #[tokio::test]
    async fn fires_only_triggers_in_window() {
        let store = store_with(&[("Monday", 6, 0, 10, vec![1, 2]), ("Monday", 7, 0, 10, vec![3])]);
        let handle = SchedulerHandle::new();
        handle.recompile_for(&store, monday()).unwrap();

        let recorder = Arc::new(Recorder::default());
        let engine = SchedulerEngine::new(handle, recorder.clone(), Duration::from_secs(1));

        let at = |h, m, s| monday().and_hms_opt(h, m, s).unwrap();
        let fired = engine.fire_due(at(5, 59, 59), at(6, 0, 0));
        assert_eq!(fired.len(), 1);
        for f in fired {
            assert!(f.await.unwrap().is_acknowledged());
        }
        // OFF at 06:10, not yet.
        assert!(engine.fire_due(at(6, 0, 0), at(6, 9, 59)).is_empty());
        for f in engine.fire_due(at(6, 9, 59), at(6, 10, 0)) {
            f.await.unwrap();
        }

        let calls = recorder.0.lock().unwrap().clone();
        assert_eq!(calls, vec![(Command::On, vec![1, 2]), (Command::Off, vec![1, 2])]);
    }

    #[tokio::test]
    async fn triggers_recur_weekly() {
        let store = store_with(&[("Monday", 6, 0, 10, vec![1])]);
        let handle = SchedulerHandle::new();
        handle.recompile_for(&store, monday()).unwrap();
        let engine = SchedulerEngine::new(handle, Arc::new(Recorder::default()), Duration::from_secs(1));

        let next_monday = monday() + chrono::Duration::days(7);
        assert_eq!(next_monday.weekday(), chrono::Weekday::Mon);
        let fired = engine.fire_due(
            next_monday.and_hms_opt(5, 59, 0).unwrap(),
            next_monday.and_hms_opt(6, 0, 30).unwrap(),
        );
        assert_eq!(fired.len(), 1);
    }

    #[tokio::test]
    async fn coinciding_triggers_fire_independently() {
        let store = store_with(&[("Monday", 6, 0, 10, vec![1]), ("Monday", 6, 0, 20, vec![2])]);
        let handle = SchedulerHandle::new();
        handle.recompile_for(&store, monday()).unwrap();
        let recorder = Arc::new(Recorder::default());
        let engine = SchedulerEngine::new(handle, recorder.clone(), Duration::from_secs(1));

        let fired = engine.fire_due(
            monday().and_hms_opt(5, 59, 59).unwrap(),
            monday().and_hms_opt(6, 0, 0).unwrap(),
        );
        assert_eq!(fired.len(), 2);
        for f in fired {
            f.await.unwrap();
        }
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let engine = SchedulerEngine::new(
            SchedulerHandle::new(),
            Arc::new(Recorder::default()),
            Duration::from_millis(10),
        );
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(engine.run(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("engine did not stop")
            .unwrap();
    }
}
