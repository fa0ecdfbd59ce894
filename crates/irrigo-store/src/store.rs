use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use irrigo_core::{CancellationOverride, ClockTime, ScheduleEntry, ValveId, ValveInfo};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, instrument, warn};

use crate::db::init_db;
use crate::error::{Result, StoreError};

/// Owns the schedule, the cancellation override and the valve table.
///
/// Entries keep insertion order; the index handed to [`remove_at`] is the
/// position in [`list`].
///
/// [`remove_at`]: ScheduleStore::remove_at
/// [`list`]: ScheduleStore::list
pub struct ScheduleStore {
    conn: Mutex<Connection>,
}

impl ScheduleStore {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- schedule ----------------------------------------------------------

    /// Readable entries in insertion order.
    ///
    /// Rows that no longer parse (bad time, negative duration, broken valve
    /// list) are skipped with a warning and do not take up an index.
    pub fn list(&self) -> Result<Vec<ScheduleEntry>> {
        Ok(self.rows()?.into_iter().map(|(_, entry)| entry).collect())
    }

    fn rows(&self) -> Result<Vec<(i64, ScheduleEntry)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, day, start, duration_minutes, valves
             FROM schedule_entries ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,    // id
                row.get::<_, String>(1)?, // day
                row.get::<_, String>(2)?, // start HH:MM
                row.get::<_, i64>(3)?,    // duration_minutes
                row.get::<_, String>(4)?, // valves JSON
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, day, start, duration, valves) = match row {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable schedule row");
                    continue;
                }
            };
            match parse_entry(day, &start, duration, &valves) {
                Ok(entry) => entries.push((id, entry)),
                Err(reason) => warn!(id, %reason, "skipping unreadable schedule row"),
            }
        }
        Ok(entries)
    }

    /// Append an entry and return its index.
    #[instrument(skip(self, entry), fields(day = %entry.day, start = %entry.start))]
    pub fn add(&self, entry: &ScheduleEntry) -> Result<usize> {
        let valves = serde_json::to_string(&entry.valves)?;
        self.conn().execute(
            "INSERT INTO schedule_entries (day, start, duration_minutes, valves)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.day, entry.start.to_string(), entry.duration_minutes, valves],
        )?;
        let index = self.rows()?.len().saturating_sub(1);
        info!(index, "schedule entry added");
        Ok(index)
    }

    /// Delete the entry at `index` of [`list`](Self::list); the relative
    /// order of the rest is kept.
    #[instrument(skip(self))]
    pub fn remove_at(&self, index: usize) -> Result<()> {
        let rows = self.rows()?;
        let Some((id, _)) = rows.get(index) else {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: rows.len(),
            });
        };
        self.conn()
            .execute("DELETE FROM schedule_entries WHERE id = ?1", [*id])?;
        info!(index, "schedule entry removed");
        Ok(())
    }

    // --- cancellation override ---------------------------------------------

    /// Current override; `Active` (no cancellation) when never set.
    pub fn get_override(&self) -> Result<CancellationOverride> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT active, date FROM override_state WHERE id = 1",
                [],
                |row| Ok((row.get::<_, bool>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;
        let Some((active, date)) = row else {
            return Ok(CancellationOverride::default());
        };
        let date = date
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|e| StoreError::Corrupt {
                    id: 1,
                    reason: format!("override date {d:?}: {e}"),
                })
            })
            .transpose()?;
        Ok(CancellationOverride { active, date })
    }

    pub fn set_override(&self, value: &CancellationOverride) -> Result<()> {
        let date = value.date.map(|d| d.format("%Y-%m-%d").to_string());
        self.conn().execute(
            "INSERT INTO override_state (id, active, date) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET active = excluded.active, date = excluded.date",
            params![value.active, date],
        )?;
        info!(active = value.active, date = ?value.date, "override saved");
        Ok(())
    }

    // --- valve table -------------------------------------------------------

    pub fn valves(&self) -> Result<Vec<ValveInfo>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT logical_id, physical_id, name FROM valves ORDER BY logical_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(ValveInfo {
                id: row.get(0)?,
                physical: row.get(1)?,
                name: row.get(2)?,
            })
        })?;
        let valves = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(valves)
    }

    /// Replace the whole valve table in one transaction.
    pub fn replace_valves(&self, rows: &[ValveInfo]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM valves", [])?;
        for row in rows {
            tx.execute(
                "INSERT INTO valves (logical_id, physical_id, name) VALUES (?1, ?2, ?3)",
                params![row.id, row.physical, row.name],
            )?;
        }
        tx.commit()?;
        info!(count = rows.len(), "valve table saved");
        Ok(())
    }

    /// Write `rows` only when the valve table is still empty.
    /// Returns whether anything was written.
    pub fn seed_valves(&self, rows: &[ValveInfo]) -> Result<bool> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM valves", [], |r| r.get(0))?;
        if count > 0 {
            return Ok(false);
        }
        self.replace_valves(rows)?;
        Ok(true)
    }
}

fn parse_entry(
    day: String,
    start: &str,
    duration: i64,
    valves: &str,
) -> std::result::Result<ScheduleEntry, String> {
    let start = start.parse::<ClockTime>().map_err(|e| e.to_string())?;
    let duration_minutes =
        u32::try_from(duration).map_err(|_| format!("invalid duration: {duration}"))?;
    let valves: Vec<ValveId> =
        serde_json::from_str(valves).map_err(|e| format!("invalid valve list: {e}"))?;
    Ok(ScheduleEntry {
        day,
        start,
        duration_minutes,
        valves,
    })
}
