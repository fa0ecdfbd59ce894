//! Operator console contract.
//!
//! Every mutation persists first and recompiles the trigger set before it
//! returns, so the console always reads the freshly compiled state.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, NaiveDate};
use irrigo_core::{
    ClockTime, Command, IrrigoError, OverrideState, PhysicalId, Result, ScheduleEntry,
    SharedRegistry, ValveId, ValveInfo, ValveRegistry,
};
use irrigo_device::{CommandOutcome, StatusReading, StatusSynchronizer, ValveDriver};
use irrigo_scheduler::SchedulerHandle;
use irrigo_store::{ActionJournal, ScheduleStore};
use serde::Serialize;
use tracing::{info, warn};

/// Source of "today" for override evaluation.
pub type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// A schedule entry as shown to the operator.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRow {
    /// Storage index, used for deletion.
    pub index: usize,
    #[serde(flatten)]
    pub entry: ScheduleEntry,
    pub valve_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideView {
    #[serde(flatten)]
    pub state: OverrideState,
    /// Today's watering is currently canceled.
    pub canceled_today: bool,
    /// At least one entry falls on today's weekday.
    pub scheduled_today: bool,
}

/// A known valve with its effective channel and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValveRow {
    pub id: ValveId,
    pub physical: PhysicalId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionRow {
    pub timestamp: DateTime<Local>,
    pub action: Command,
    pub valves: Vec<ValveId>,
    pub valve_names: Vec<String>,
}

pub struct Controller {
    store: ScheduleStore,
    journal: Arc<ActionJournal>,
    registry: SharedRegistry,
    driver: Arc<dyn ValveDriver>,
    status: StatusSynchronizer,
    scheduler: SchedulerHandle,
    today: Clock,
}

impl Controller {
    pub fn new(
        store: ScheduleStore,
        journal: Arc<ActionJournal>,
        registry: SharedRegistry,
        driver: Arc<dyn ValveDriver>,
        scheduler: SchedulerHandle,
        today: Clock,
    ) -> Self {
        let status = StatusSynchronizer::new(Arc::clone(&driver), Arc::clone(&registry));
        Self {
            store,
            journal,
            registry,
            driver,
            status,
            scheduler,
            today,
        }
    }

    fn registry(&self) -> std::sync::RwLockReadGuard<'_, ValveRegistry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn names(&self, valves: &[ValveId]) -> Vec<String> {
        let registry = self.registry();
        valves.iter().map(|v| registry.display_name(*v)).collect()
    }

    /// Rebuild the trigger set from the store.
    pub fn recompile(&self) -> Result<usize> {
        let compilation = self.scheduler.recompile_for(&self.store, (self.today)())?;
        Ok(compilation.triggers().len())
    }

    pub fn trigger_count(&self) -> usize {
        self.scheduler.triggers().len()
    }

    // --- schedule ----------------------------------------------------------

    /// Entries sorted by weekday then start time; unknown days last.
    pub fn list_schedule(&self) -> Result<Vec<ScheduleRow>> {
        let mut rows: Vec<ScheduleRow> = self
            .store
            .list()?
            .into_iter()
            .enumerate()
            .map(|(index, entry)| ScheduleRow {
                index,
                valve_names: self.names(&entry.valves),
                entry,
            })
            .collect();
        rows.sort_by_key(|row| sort_key(&row.entry));
        Ok(rows)
    }

    pub fn add_entry(&self, entry: ScheduleEntry) -> Result<usize> {
        let entry = entry.normalized()?;
        {
            let registry = self.registry();
            if let Some(id) = entry.valves.iter().find(|v| !registry.contains(**v)) {
                return Err(IrrigoError::UnknownValve { id: *id });
            }
        }
        let index = self.store.add(&entry)?;
        self.recompile()?;
        Ok(index)
    }

    pub fn remove_entry(&self, index: usize) -> Result<()> {
        self.store.remove_at(index)?;
        self.recompile()?;
        Ok(())
    }

    // --- cancellation override ---------------------------------------------

    pub fn override_view(&self) -> Result<OverrideView> {
        let today = (self.today)();
        let cancellation = self.store.get_override()?;
        let scheduled_today = self
            .store
            .list()?
            .iter()
            .any(|e| e.weekday() == Some(today.weekday()));
        Ok(OverrideView {
            state: cancellation.state(),
            canceled_today: cancellation.is_canceled_on(today),
            scheduled_today,
        })
    }

    pub fn toggle_override(&self) -> Result<OverrideView> {
        let today = (self.today)();
        let next = self.store.get_override()?.toggled(today);
        self.store.set_override(&next)?;
        info!(state = ?next.state(), "watering override toggled");
        self.recompile()?;
        self.override_view()
    }

    // --- valves ------------------------------------------------------------

    pub fn valves(&self) -> Vec<ValveRow> {
        let registry = self.registry();
        registry
            .known_ids()
            .into_iter()
            .map(|id| ValveRow {
                id,
                physical: registry.resolve_physical(id),
                name: registry.display_name(id),
            })
            .collect()
    }

    /// Replace the mapping and names wholesale.
    pub fn set_valve_config(&self, rows: Vec<ValveInfo>) -> Result<Vec<ValveInfo>> {
        self.store.replace_valves(&rows)?;
        let registry = ValveRegistry::from_rows(rows);
        let saved = registry.rows();
        *self.registry.write().unwrap_or_else(|e| e.into_inner()) = registry;
        self.recompile()?;
        Ok(saved)
    }

    pub async fn switch_valve(&self, id: ValveId, command: Command) -> Result<CommandOutcome> {
        if !self.registry().contains(id) {
            return Err(IrrigoError::UnknownValve { id });
        }
        Ok(self.driver.send_command(command, &[id]).await)
    }

    pub async fn close_all(&self) -> CommandOutcome {
        let ids = self.registry().known_ids();
        self.driver.send_command(Command::Off, &ids).await
    }

    // --- device queries ----------------------------------------------------

    pub async fn query_status(&self) -> StatusReading {
        self.status.read().await
    }

    pub async fn uptime(&self) -> Option<String> {
        self.driver.uptime().await
    }

    /// Last `n` actions, oldest first. An unreadable log reads as empty.
    pub fn recent_actions(&self, n: usize) -> Vec<ActionRow> {
        let entries = match self.journal.recent(n) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "action log unreadable");
                return Vec::new();
            }
        };
        entries
            .into_iter()
            .map(|e| ActionRow {
                valve_names: self.names(&e.valves),
                timestamp: e.timestamp,
                action: e.action,
                valves: e.valves,
            })
            .collect()
    }
}

fn sort_key(entry: &ScheduleEntry) -> (u32, ClockTime) {
    let day = entry
        .weekday()
        .map(|d| d.num_days_from_monday())
        .unwrap_or(7);
    (day, entry.start)
}
