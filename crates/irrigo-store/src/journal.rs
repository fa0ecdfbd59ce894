use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local};
use irrigo_core::{ActionLogEntry, ActionSink, Command, IrrigoError, ValveId};
use rusqlite::{params, Connection};
use tracing::{debug, warn};

use crate::db::init_db;
use crate::error::Result;

/// Append-only record of every acknowledged on/off command.
pub struct ActionJournal {
    conn: Mutex<Connection>,
}

impl ActionJournal {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn append(&self, entry: &ActionLogEntry) -> Result<()> {
        let valves = serde_json::to_string(&entry.valves)?;
        self.conn().execute(
            "INSERT INTO action_log (timestamp, action, valves) VALUES (?1, ?2, ?3)",
            params![entry.timestamp.to_rfc3339(), entry.action.as_str(), valves],
        )?;
        debug!(action = %entry.action, valves = ?entry.valves, "action recorded");
        Ok(())
    }

    /// The last `n` entries, oldest first.
    ///
    /// Rows that no longer parse are skipped.
    pub fn recent(&self, n: usize) -> Result<Vec<ActionLogEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, action, valves FROM action_log
             ORDER BY id DESC LIMIT ?1",
        )?;
        let mut entries: Vec<ActionLogEntry> = stmt
            .query_map([n as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .filter_map(|r| {
                let (id, timestamp, action, valves) = r.ok()?;
                let parsed = parse_row(&timestamp, &action, &valves);
                if parsed.is_none() {
                    warn!(id, "skipping unreadable action log row");
                }
                parsed
            })
            .collect();
        entries.reverse();
        Ok(entries)
    }
}

fn parse_row(timestamp: &str, action: &str, valves: &str) -> Option<ActionLogEntry> {
    let timestamp: DateTime<Local> = DateTime::parse_from_rfc3339(timestamp)
        .ok()?
        .with_timezone(&Local);
    let action: Command = action.parse().ok()?;
    let valves: Vec<ValveId> = serde_json::from_str(valves).ok()?;
    Some(ActionLogEntry {
        timestamp,
        action,
        valves,
    })
}

impl ActionSink for ActionJournal {
    fn record(&self, entry: &ActionLogEntry) -> irrigo_core::Result<()> {
        self.append(entry).map_err(IrrigoError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal() -> ActionJournal {
        ActionJournal::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn empty_log_reads_as_empty() {
        assert!(journal().recent(30).unwrap().is_empty());
    }

    #[test]
    fn recent_returns_last_n_oldest_first() {
        let j = journal();
        for i in 0..40u32 {
            let action = if i % 2 == 0 { Command::On } else { Command::Off };
            j.append(&ActionLogEntry::now(action, &[i])).unwrap();
        }
        let recent = j.recent(30).unwrap();
        assert_eq!(recent.len(), 30);
        assert_eq!(recent.first().unwrap().valves, vec![10]);
        assert_eq!(recent.last().unwrap().valves, vec![39]);
        assert_eq!(recent.last().unwrap().action, Command::Off);
    }

    #[test]
    fn unreadable_rows_are_skipped() {
        let j = journal();
        j.append(&ActionLogEntry::now(Command::On, &[1])).unwrap();
        j.conn()
            .execute(
                "INSERT INTO action_log (timestamp, action, valves) VALUES ('yesterday', 'on', '[1]')",
                [],
            )
            .unwrap();
        j.append(&ActionLogEntry::now(Command::Off, &[1])).unwrap();
        let recent = j.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].action, Command::Off);
    }

    #[test]
    fn sink_records_into_journal() {
        let j = journal();
        let sink: &dyn ActionSink = &j;
        sink.record(&ActionLogEntry::now(Command::On, &[2, 3])).unwrap();
        assert_eq!(j.recent(1).unwrap()[0].valves, vec![2, 3]);
    }
}
